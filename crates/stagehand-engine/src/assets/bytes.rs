//! Little-endian cursor helpers shared by the blob and font formats.

/// Not enough bytes left: `need` more were required at offset `at`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub(crate) struct Short {
    pub at: usize,
    pub need: usize,
}

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_le {
    ($name:ident, $ty:ty) => {
        pub fn $name(&mut self) -> Result<$ty, Short> {
            let raw = self.take(std::mem::size_of::<$ty>())?;
            let mut buf = [0u8; std::mem::size_of::<$ty>()];
            buf.copy_from_slice(raw);
            Ok(<$ty>::from_le_bytes(buf))
        }
    };
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8], Short> {
        if self.remaining() < n {
            return Err(Short { at: self.pos, need: n - self.remaining() });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    read_le!(u8, u8);
    read_le!(u16, u16);
    read_le!(u32, u32);
    read_le!(i32, i32);
    read_le!(i64, i64);
    read_le!(f32, f32);

    /// Unsigned LEB128 (7 bits per byte, high bit = continuation).
    pub fn uleb128(&mut self) -> Result<Option<u64>, Short> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let byte = self.u8()?;
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    /// LEB128 length-prefixed string. `Ok(None)` when the bytes are not a valid string.
    pub fn string(&mut self) -> Result<Option<String>, Short> {
        let Some(len) = self.uleb128()? else {
            return Ok(None);
        };
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let raw = self.take(len)?;
        Ok(std::str::from_utf8(raw).ok().map(str::to_owned))
    }
}

pub(crate) fn put_uleb128(out: &mut Vec<u8>, mut v: u64) {
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

pub(crate) fn put_string(out: &mut Vec<u8>, s: &str) {
    put_uleb128(out, s.len() as u64);
    out.extend_from_slice(s.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leb128_multi_byte_lengths() {
        let mut out = Vec::new();
        put_uleb128(&mut out, 300);
        assert_eq!(out, vec![0xac, 0x02]);
        assert_eq!(ByteReader::new(&out).uleb128(), Ok(Some(300)));
    }

    #[test]
    fn long_string_uses_two_byte_prefix() {
        let name = "x".repeat(200);
        let mut out = Vec::new();
        put_string(&mut out, &name);
        assert_eq!(out.len(), 202);
        assert_eq!(ByteReader::new(&out).string(), Ok(Some(name)));
    }

    #[test]
    fn short_reads_report_position() {
        let data = [1u8, 2, 3];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.u16(), Ok(0x0201));
        assert_eq!(r.i32(), Err(Short { at: 2, need: 3 }));
    }
}
