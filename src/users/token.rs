use rand::{rngs::OsRng, RngCore};

pub const KEY_BYTES: usize = 20;

/// Fresh opaque token key: 20 random bytes as 40 lowercase hex chars.
pub fn generate_key() -> String {
    let mut bytes = [0u8; KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
