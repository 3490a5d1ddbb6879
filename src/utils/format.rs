use solana_sdk::pubkey::Pubkey;

/// Format a pubkey for display (shortened)
pub fn format_pubkey(pubkey: &Pubkey) -> String {
    let pubkey_str = pubkey.to_string();
    let len = pubkey_str.len();
    format!("{}...{}", &pubkey_str[0..4], &pubkey_str[len - 4..len])
}

/// Format a price ratio as a signed percentage change
pub fn format_change(ratio: f64) -> String {
    format!("{:+.2}%", (ratio - 1.0) * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn shortens_pubkeys() {
        let pubkey = Pubkey::from_str("So11111111111111111111111111111111111111112").unwrap();
        assert_eq!(format_pubkey(&pubkey), "So11...1112");
    }

    #[test]
    fn formats_ratio_as_change() {
        assert_eq!(format_change(1.3), "+30.00%");
        assert_eq!(format_change(0.8), "-20.00%");
    }
}
