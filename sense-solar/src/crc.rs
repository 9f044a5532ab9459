//! CRC-8 used by Sensirion sensors to protect each 16-bit data word.
//!
//! Polynomial 0x31 (x^8 + x^5 + x^4 + 1), initial value 0xFF, MSB first, no
//! reflection and no final XOR.

use crc_all::Crc;

const POLYNOMIAL: u8 = 0x31;
const WIDTH: usize = 8;
const INITIAL: u8 = 0xff;
const XOR: u8 = 0;
const REFLECT: bool = false;

/// Compute the CRC-8 of `bytes`. An empty input yields the initial value, 0xFF.
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc8 = Crc::<u8>::new(POLYNOMIAL, WIDTH, INITIAL, XOR, REFLECT);

    crc8.update(bytes);
    crc8.finish()
}

/// Whether `crc` is the checksum of the big-endian data word `word`.
pub fn check_word(word: [u8; 2], crc: u8) -> bool {
    crc8(&word) == crc
}
