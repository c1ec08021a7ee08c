//! AKA' network-name matching, RFC 5448 section 3.1: a colon-separated
//! prefix match between the locally configured name and the one the network
//! advertised in AT_KDF_INPUT.

/// `true` if `local` is a colon-separated prefix of `network`, or `local` is empty
pub fn network_name_matches(local: &str, network: &str) -> bool {
    if local.is_empty() {
        return true;
    }
    let local_parts: Vec<&str> = local.split(':').collect();
    let network_parts: Vec<&str> = network.split(':').collect();
    if local_parts.len() > network_parts.len() {
        return false;
    }
    local_parts.iter().zip(network_parts.iter()).all(|(a, b)| a == b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_diverging_suffix() {
        assert!(!network_name_matches("a:b:c", "a:b:d"));
    }

    #[test]
    fn accepts_proper_prefix() {
        assert!(network_name_matches("a:b", "a:b:c"));
    }

    #[test]
    fn empty_local_matches_anything() {
        assert!(network_name_matches("", "3GPP:WLAN"));
    }

    #[test]
    fn mismatched_single_segment_is_rejected() {
        assert!(!network_name_matches("WLAN", "3GPP:WLAN"));
    }
}
