//! Packed Vulkan API version values.

use std::fmt;

use ash::vk;

/// A Vulkan API version, packed as variant/major/minor/patch per the
/// `VK_MAKE_API_VERSION` bit layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct ApiVersion(u32);

impl ApiVersion {
    /// Vulkan 1.0, the floor every loader supports.
    pub const V1_0: Self = Self(vk::API_VERSION_1_0);

    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self(vk::make_api_version(0, major, minor, patch))
    }

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub const fn major(self) -> u32 {
        vk::api_version_major(self.0)
    }

    pub const fn minor(self) -> u32 {
        vk::api_version_minor(self.0)
    }

    pub const fn patch(self) -> u32 {
        vk::api_version_patch(self.0)
    }
}

impl From<u32> for ApiVersion {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_components() {
        let v = ApiVersion::new(1, 3, 281);
        assert_eq!(v.major(), 1);
        assert_eq!(v.minor(), 3);
        assert_eq!(v.patch(), 281);
        assert_eq!(ApiVersion::from_raw(v.as_raw()), v);
    }

    #[test]
    fn displays_dotted_triple() {
        assert_eq!(ApiVersion::new(1, 2, 0).to_string(), "1.2.0");
    }

    #[test]
    fn matches_ash_packing() {
        assert_eq!(
            ApiVersion::new(1, 3, 0).as_raw(),
            vk::make_api_version(0, 1, 3, 0)
        );
        assert_eq!(ApiVersion::V1_0.as_raw(), vk::API_VERSION_1_0);
    }
}
