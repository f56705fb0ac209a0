use rand::Rng;

/// Ambiguous glyphs (0/1/I/O) are excluded from voucher codes.
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const CODE_LEN: usize = 10;

pub fn generate_voucher_code(prefix: &str) -> String {
    let mut rng = rand::thread_rng();
    let chunk: String = (0..CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{prefix}-{chunk}")
}

/// 6-digit numeric redemption code, zero-padded.
pub fn generate_redemption_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000))
}
