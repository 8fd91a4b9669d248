use std::fmt;

/// One of the two interchangeable `openvr_api.dll` builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// The stock SteamVR runtime binary
    SteamVr,
    /// The OpenComposite replacement binary
    OpenComposite,
}

impl Variant {
    /// The variant a swap switches to
    pub fn other(self) -> Self {
        match self {
            Variant::SteamVr => Variant::OpenComposite,
            Variant::OpenComposite => Variant::SteamVr,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Variant::SteamVr => "SteamVR",
            Variant::OpenComposite => "OpenComposite",
        }
    }

    /// Index used by `RUNTIME.LastUsed` in config.ini (0 = SteamVR, 1 = OpenComposite)
    pub fn as_index(self) -> u8 {
        match self {
            Variant::SteamVr => 0,
            Variant::OpenComposite => 1,
        }
    }

    pub fn from_index(index: &str) -> Option<Self> {
        match index.trim() {
            "0" => Some(Variant::SteamVr),
            "1" => Some(Variant::OpenComposite),
            _ => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What currently occupies the target path.
///
/// `Unknown` means a file is present but its digest matches neither configured
/// hash. `Missing` means there is no file at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstalledState {
    Installed(Variant),
    Unknown,
    Missing,
}

impl InstalledState {
    pub fn variant(self) -> Option<Variant> {
        match self {
            InstalledState::Installed(variant) => Some(variant),
            InstalledState::Unknown | InstalledState::Missing => None,
        }
    }
}

impl fmt::Display for InstalledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstalledState::Installed(variant) => write!(f, "{} binaries", variant),
            InstalledState::Unknown => f.write_str("unrecognized binaries"),
            InstalledState::Missing => f.write_str("no openvr_api.dll"),
        }
    }
}
