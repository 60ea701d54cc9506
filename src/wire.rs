//! Versioned binary wire format.
//!
//! ```text
//! u16   data_format_major_version   (currently 1)
//! u16   data_format_minor_version   (currently 0)
//! i32   bits_per_index (b)
//! u8    flags: bit0 = exact active, bit1 = sparse active, else dense
//! if exact:   i32 n; u64[n] hashes
//! if sparse:  i32 n; { u16 index; u8 rank }[n]
//! if dense:   i32 m; u8[m] ranks
//! ```
//!
//! `count_additions` is not part of the v1.0 format.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::dense::DenseRegisters;
use crate::error::HllError;
use crate::exact::ExactSet;
use crate::hash::default_hash;
use crate::precision::Precision;
use crate::sketch::{Sketch, Store};
use crate::sparse::SparseRegisters;

const FORMAT_MAJOR: u16 = 1;
const FORMAT_MINOR: u16 = 0;

const FLAG_EXACT: u8 = 0x01;
const FLAG_SPARSE: u8 = 0x02;

impl Sketch {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_u16::<LittleEndian>(FORMAT_MAJOR).unwrap();
        buf.write_u16::<LittleEndian>(FORMAT_MINOR).unwrap();
        buf.write_i32::<LittleEndian>(self.precision.b() as i32).unwrap();

        let flags = match &self.store {
            Store::Exact(_) => FLAG_EXACT,
            Store::Sparse(_) => FLAG_SPARSE,
            Store::Dense(_) => 0,
        };
        buf.write_u8(flags).unwrap();

        match &self.store {
            Store::Exact(set) => {
                buf.write_i32::<LittleEndian>(set.len() as i32).unwrap();
                for hash in set.iter() {
                    buf.write_u64::<LittleEndian>(hash).unwrap();
                }
            }
            Store::Sparse(sparse) => {
                buf.write_i32::<LittleEndian>(sparse.len() as i32).unwrap();
                for (index, rank) in sparse.iter() {
                    buf.write_u16::<LittleEndian>(index).unwrap();
                    buf.write_u8(rank).unwrap();
                }
            }
            Store::Dense(dense) => {
                buf.write_i32::<LittleEndian>(dense.len() as i32).unwrap();
                buf.extend_from_slice(dense.as_slice());
            }
        }

        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HllError> {
        let mut cursor = Cursor::new(bytes);

        let major = cursor.read_u16::<LittleEndian>().map_err(|_| HllError::IncompatibleFormat(0))?;
        if major != FORMAT_MAJOR {
            return Err(HllError::IncompatibleFormat(major));
        }
        let _minor = cursor.read_u16::<LittleEndian>().map_err(|_| HllError::IncompatibleFormat(major))?;

        let b = cursor.read_i32::<LittleEndian>().map_err(|_| HllError::IncompatibleFormat(major))? as u32;
        let precision = Precision::new(b)?;

        let flags = cursor.read_u8().map_err(|_| HllError::IncompatibleFormat(major))?;

        let direct_counting = flags & FLAG_EXACT != 0;

        let store = if flags & FLAG_EXACT != 0 {
            let n = cursor.read_i32::<LittleEndian>().unwrap() as usize;
            let mut set = ExactSet::new();
            for _ in 0..n {
                set.insert(cursor.read_u64::<LittleEndian>().unwrap());
            }
            // No shadow needs rebuilding here: `set` carries every hash
            // observed, so a later overflow transition (see `add`) replays
            // them through the register codec exactly as it would for a
            // sketch that reached 101 distinct hashes organically.
            Store::Exact(set)
        } else if flags & FLAG_SPARSE != 0 {
            let n = cursor.read_i32::<LittleEndian>().unwrap() as usize;
            let mut sparse = SparseRegisters::new();
            for _ in 0..n {
                let index = cursor.read_u16::<LittleEndian>().unwrap();
                let rank = cursor.read_u8().unwrap();
                sparse.set_if_greater(index, rank);
            }
            Store::Sparse(sparse)
        } else {
            let m = cursor.read_i32::<LittleEndian>().unwrap() as usize;
            let mut remaining = vec![0u8; m];
            cursor
                .read_exact(&mut remaining)
                .map_err(|_| HllError::IncompatibleFormat(major))?;
            Store::Dense(DenseRegisters::from_slice(&remaining))
        };

        Ok(Sketch {
            precision,
            direct_counting,
            hash: default_hash(),
            store,
            count_additions: 0,
        })
    }
}
