use anyhow::Result;
use std::path::Path;

/// A raw binary mapped at `base`.
#[derive(Debug, Clone)]
pub struct Image {
    pub base: u32,
    pub bytes: Vec<u8>,
}

impl Image {
    pub fn end(&self) -> u32 {
        self.base.wrapping_add(self.bytes.len() as u32)
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr < self.end()
    }

    /// Bytes of `[start, end)`, clipped to the image.
    pub fn window(&self, start: u32, end: u32) -> Option<&[u8]> {
        if end < start || !self.contains(start) {
            return None;
        }
        let lo = (start - self.base) as usize;
        let hi = (end.min(self.end()) - self.base) as usize;
        self.bytes.get(lo..hi)
    }
}

pub fn load_raw_bin(path: &Path, base: u32, skip: usize, len: Option<usize>) -> Result<Image> {
    let file = std::fs::read(path)?;
    anyhow::ensure!(skip <= file.len(), "--skip exceeds file size");
    let mut payload = &file[skip..];
    if let Some(lim) = len {
        anyhow::ensure!(lim <= payload.len(), "--len exceeds remaining file size after skip");
        payload = &payload[..lim];
    }
    Ok(Image {
        base,
        bytes: payload.to_vec(),
    })
}

/// CLI address: decimal, `0x` hex or `H`-suffixed hex.
pub fn parse_addr(s: &str) -> Result<u32> {
    let v = asmsim::literal::parse(s, 10).ok_or_else(|| anyhow::anyhow!("bad address {s:?}"))?;
    Ok(u32::try_from(v)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn loader_maps_skip_and_len() {
        let path = std::env::temp_dir().join("asmsim_disasm_loader.bin");
        std::fs::write(&path, [0u8, 1, 2, 3, 4, 5]).unwrap();
        let img = load_raw_bin(&path, 0x100, 2, Some(3)).unwrap();
        assert_eq!(img.bytes, vec![2, 3, 4]);
        assert_eq!(img.window(0x101, 0x200), Some(&[3u8, 4][..]));
        assert_eq!(img.window(0x103, 0x104), None);
        assert!(load_raw_bin(&path, 0, 7, None).is_err());
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn addresses() {
        assert_eq!(parse_addr("0x10").unwrap(), 0x10);
        assert_eq!(parse_addr("16").unwrap(), 16);
        assert_eq!(parse_addr("8500H").unwrap(), 0x8500);
        assert!(parse_addr("zz").is_err());
        assert!(parse_addr("-1").is_err());
    }
}
