//! Deterministic MAC address derivation: `SHA1(name || ip || vm_id)` with the
//! locally-administered unicast prefix `0a:58`. A pure function — same
//! inputs always yield the same output.

use sha1::{Digest, Sha1};

/// Derives a MAC address from a VM's name, allocated IP, and surrogate ID.
pub fn derive_mac(name: &str, ip: &str, vm_id: i64) -> String {
    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    hasher.update(ip.as_bytes());
    hasher.update(vm_id.to_be_bytes());
    let digest = hasher.finalize();

    format!(
        "0a:58:{:02x}:{:02x}:{:02x}:{:02x}",
        digest[0], digest[1], digest[2], digest[3]
    )
}

/// Bounds a tap device name to the kernel's 15-byte `IFNAMSIZ - 1` limit by
/// appending a 4-byte hex hash of the full name and truncating.
pub fn tap_name_for(vm_name: &str) -> String {
    const PREFIX: &str = "vttap-";
    const MAX_LEN: usize = 15;

    let candidate = format!("{PREFIX}{vm_name}");
    if candidate.len() <= MAX_LEN {
        return candidate;
    }

    let mut hasher = Sha1::new();
    hasher.update(vm_name.as_bytes());
    let digest = hasher.finalize();
    let suffix = format!("{:02x}{:02x}", digest[0], digest[1]);

    let budget = MAX_LEN - PREFIX.len() - suffix.len();
    let truncated: String = vm_name.chars().take(budget).collect();
    format!("{PREFIX}{truncated}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_pure() {
        assert_eq!(
            derive_mac("web-1", "10.0.0.5", 42),
            derive_mac("web-1", "10.0.0.5", 42)
        );
    }

    #[test]
    fn derivation_uses_locally_administered_prefix() {
        assert!(derive_mac("web-1", "10.0.0.5", 42).starts_with("0a:58:"));
    }

    #[test]
    fn tap_name_fits_ifnamsiz() {
        let name = tap_name_for("a-very-long-vm-name-that-exceeds-the-limit");
        assert!(name.len() <= 15);
        assert!(name.starts_with("vttap-"));
    }

    #[test]
    fn short_names_pass_through() {
        assert_eq!(tap_name_for("web-1"), "vttap-web-1");
    }
}
