//! Runtime class detection from the requested host name.

use strum::{EnumIter, IntoStaticStr};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, EnumIter, IntoStaticStr)]
pub enum RuntimeClass {
    #[strum(serialize = "firecracker")]
    Firecracker,
    #[strum(serialize = "qemu")]
    Qemu,
    #[strum(serialize = "cloud-hypervisor")]
    CloudHypervisor,
    #[strum(serialize = "dragonball")]
    Dragonball,
    #[strum(serialize = "urunc-fc")]
    UruncFc,
    #[strum(serialize = "urunc-qemu")]
    UruncQemu,
    #[default]
    #[strum(serialize = "container")]
    Container,
}

/// Host substrings checked in order, first hit wins.
///
/// `hellofc` and `helloqemu` are prefixes of the urunc patterns, so the urunc
/// rules have to come first.
pub const CLASSIFICATION_RULES: [(&str, RuntimeClass); 6] = [
    ("hellouruncfc", RuntimeClass::UruncFc),
    ("hellouruncqemu", RuntimeClass::UruncQemu),
    ("hellofc", RuntimeClass::Firecracker),
    ("helloqemu", RuntimeClass::Qemu),
    ("helloclh", RuntimeClass::CloudHypervisor),
    ("hellors", RuntimeClass::Dragonball),
];

impl RuntimeClass {
    pub fn image_url(self) -> &'static str {
        match self {
            Self::Firecracker => "https://s3.nbfc.io/hypervisor-logos/firecracker.png",
            Self::Qemu => "https://s3.nbfc.io/hypervisor-logos/qemu.png",
            Self::CloudHypervisor => "https://s3.nbfc.io/hypervisor-logos/clh.png",
            Self::Dragonball => "https://s3.nbfc.io/hypervisor-logos/dragonball.png",
            Self::UruncFc => "https://s3.nbfc.io/hypervisor-logos/uruncfc.png",
            Self::UruncQemu => "https://s3.nbfc.io/hypervisor-logos/uruncqemu.png",
            Self::Container => "https://s3.nbfc.io/hypervisor-logos/container.png",
        }
    }
}

/// Maps a host to its runtime class. A missing host, or one matching no rule,
/// is a plain container.
pub fn classify(host: Option<&str>) -> RuntimeClass {
    let Some(host) = host else {
        return RuntimeClass::default();
    };

    CLASSIFICATION_RULES
        .iter()
        .find(|(pattern, _)| host.contains(pattern))
        .map(|(_, class)| *class)
        .unwrap_or_default()
}
