use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A `major.minor.release` version triple as reported by the host driver.
///
/// Ordering is lexicographic over `(major, minor, release)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    major: u32,
    minor: u32,
    release: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, release: u32) -> Self {
        Self {
            major,
            minor,
            release,
        }
    }

    /// Parse a driver version string such as `"4.60 NVIDIA via Cg compiler"` or `"3.1.0"`.
    ///
    /// Parsing stops at the first component that does not start with a digit; any missing
    /// component is zero. Version strings come from the host driver, so this never fails.
    pub fn parse(s: &str) -> Self {
        let mut parts = [0u32; 3];
        let mut rest = s.trim_start();

        for (i, part) in parts.iter_mut().enumerate() {
            if i > 0 {
                match rest.strip_prefix('.') {
                    Some(r) => rest = r,
                    None => break,
                }
            }

            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            if digits == 0 {
                break;
            }
            *part = rest[..digits].parse().unwrap_or(u32::MAX);
            rest = &rest[digits..];
        }

        Self::new(parts[0], parts[1], parts[2])
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn release(&self) -> u32 {
        self.release
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.release)
    }
}
