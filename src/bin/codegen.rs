//! Standalone generator for twelve-character submission codes. Unrelated to
//! the dashboard server.

use rand::Rng;

const CODE_LEN: usize = 12;
const CHARSET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Draw `len` characters uniformly from the 0-9a-z charset.
fn random_code(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

fn main() {
    println!("{}", random_code(CODE_LEN));
}
