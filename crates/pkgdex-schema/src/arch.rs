//! Processor architectures and their ranking.

/// Processor architecture an installer targets.
///
/// The architecture is used to filter out installers the current machine
/// cannot run and to rank the remaining ones by preference.
///
/// # Example
///
/// ```
/// use pkgdex_schema::Architecture;
///
/// let arch: Architecture = "x64".parse().unwrap();
/// assert_eq!(arch.as_str(), "x64");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Architecture {
    /// Runs on any architecture.
    Neutral,
    /// 32-bit Intel/AMD.
    X86,
    /// 64-bit Intel/AMD.
    X64,
    /// 32-bit ARM.
    Arm,
    /// 64-bit ARM.
    Arm64,
    /// Missing or unrecognised value. Never valid in a manifest.
    #[default]
    Unknown,
}

impl Architecture {
    /// Architecture of the running process.
    pub fn current() -> Self {
        #[cfg(target_arch = "aarch64")]
        {
            Self::Arm64
        }
        #[cfg(target_arch = "x86_64")]
        {
            Self::X64
        }
        #[cfg(target_arch = "x86")]
        {
            Self::X86
        }
        #[cfg(target_arch = "arm")]
        {
            Self::Arm
        }
        #[cfg(not(any(
            target_arch = "aarch64",
            target_arch = "x86_64",
            target_arch = "x86",
            target_arch = "arm"
        )))]
        {
            Self::Unknown
        }
    }

    /// Architectures the current machine can run, most preferred first.
    ///
    /// ARM64 machines emulate x64 and x86 binaries, x64 machines run x86.
    /// [`Architecture::Neutral`] is always last.
    pub fn applicable_for_current_machine() -> Vec<Self> {
        Self::applicable_for(Self::current())
    }

    /// Architectures a machine of the given architecture can run, most
    /// preferred first.
    pub fn applicable_for(machine: Self) -> Vec<Self> {
        match machine {
            Self::Arm64 => vec![Self::Arm64, Self::X64, Self::Arm, Self::X86, Self::Neutral],
            Self::X64 => vec![Self::X64, Self::X86, Self::Neutral],
            Self::X86 => vec![Self::X86, Self::Neutral],
            Self::Arm => vec![Self::Arm, Self::Neutral],
            Self::Neutral | Self::Unknown => vec![Self::Neutral],
        }
    }

    /// Convert to the manifest string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "neutral" => Ok(Self::Neutral),
            "x86" | "i386" | "i686" => Ok(Self::X86),
            "x64" | "x86_64" | "amd64" => Ok(Self::X64),
            "arm" => Ok(Self::Arm),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            _ => Err(format!("Unknown architecture: {s}")),
        }
    }
}

impl From<String> for Architecture {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Self::Unknown)
    }
}

impl From<Architecture> for String {
    fn from(arch: Architecture) -> Self {
        arch.as_str().to_string()
    }
}

impl serde::Serialize for Architecture {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> serde::Deserialize<'de> for Architecture {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("AMD64".parse::<Architecture>(), Ok(Architecture::X64));
        assert_eq!("aarch64".parse::<Architecture>(), Ok(Architecture::Arm64));
        assert!("mips".parse::<Architecture>().is_err());
        assert_eq!(Architecture::from("mips".to_string()), Architecture::Unknown);
    }

    #[test]
    fn test_applicable_for_arm64_prefers_native() {
        let list = Architecture::applicable_for(Architecture::Arm64);
        assert_eq!(list.first(), Some(&Architecture::Arm64));
        assert_eq!(list.last(), Some(&Architecture::Neutral));
        assert!(list.contains(&Architecture::X64));
    }
}
