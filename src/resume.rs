//! Resume-point persistence (spec §3, §6): a key=value header file, a
//! length-prefixed binary group file, and a BLAKE3 checksum companion.
//! Created only on explicit interruption acknowledgment; deleted on clean
//! completion. All three files are written mode 0600.

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;

use crate::digest::{Algorithm, Digest, DigestTag};
use crate::error::ReasonCode;
use crate::types::{DigestGroup, FileRecord, ResumePoint};

const FORMAT_VERSION: u32 = 1;

/// Persist `point` to its three sidecar files, mode 0600.
pub fn persist(point: &ResumePoint) -> Result<()> {
    let groups_bytes = encode_groups(&point.groups);
    write_mode_0600(&point.groups_path, &groups_bytes)?;

    let checksum = blake3::hash(&groups_bytes);
    write_mode_0600(&point.checksum_path, checksum.to_hex().as_bytes())?;

    let header = format!(
        "format_version={}\ncreated_epoch={}\ngroup_count={}\n",
        FORMAT_VERSION,
        point.created_epoch,
        point.groups.len()
    );
    write_mode_0600(&point.header_path, header.as_bytes())?;
    Ok(())
}

/// Load a previously persisted resume point from `resume_dir`, verifying the
/// checksum before trusting the group file (spec's `resume.corrupt` reason
/// code on mismatch).
pub fn load(resume_dir: &Path) -> Result<ResumePoint> {
    let header_path = resume_dir.join("resume.header");
    let groups_path = resume_dir.join("resume.groups");
    let checksum_path = resume_dir.join("resume.checksum");

    let header = fs::read_to_string(&header_path)
        .with_context(|| format!("read resume header {}", header_path.display()))?;
    let created_epoch = parse_header_field(&header, "created_epoch")?;

    let groups_bytes = fs::read(&groups_path)
        .with_context(|| format!("read resume groups {}", groups_path.display()))?;
    let stored_checksum = fs::read_to_string(&checksum_path)
        .with_context(|| format!("read resume checksum {}", checksum_path.display()))?;
    let actual_checksum = blake3::hash(&groups_bytes).to_hex().to_string();
    if actual_checksum != stored_checksum.trim() {
        return Err(anyhow::Error::new(ReasonCode::ResumeCorrupt))
            .context("resume group file checksum mismatch");
    }

    let groups = decode_groups(&groups_bytes).context("decode resume group file")?;

    Ok(ResumePoint {
        header_path,
        groups_path,
        checksum_path,
        groups,
        created_epoch,
    })
}

/// Remove all three resume sidecar files (spec: "deleted on clean
/// completion"). Missing files are not an error.
pub fn clear(point: &ResumePoint) -> Result<()> {
    for path in [&point.header_path, &point.groups_path, &point.checksum_path] {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e).with_context(|| format!("remove resume file {}", path.display())),
        }
    }
    Ok(())
}

fn parse_header_field(header: &str, key: &str) -> Result<i64> {
    header
        .lines()
        .find_map(|line| line.strip_prefix(&format!("{key}=")))
        .and_then(|v| v.parse::<i64>().ok())
        .with_context(|| format!("missing or invalid `{key}` in resume header"))
}

fn write_mode_0600(path: &Path, contents: &[u8]) -> Result<()> {
    crate::utils::write_atomic(path, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .with_context(|| format!("set mode 0600 on {}", path.display()))?;
    }
    Ok(())
}

// --- Length-prefixed binary group encoding ---------------------------------

fn encode_groups(groups: &[DigestGroup]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&(groups.len() as u32).to_le_bytes());
    for group in groups {
        buf.extend_from_slice(&group.id.to_le_bytes());
        buf.extend_from_slice(&(group.records.len() as u32).to_le_bytes());
        for record in &group.records {
            encode_record(&mut buf, record);
        }
    }
    buf
}

fn encode_record(buf: &mut Vec<u8>, record: &FileRecord) {
    let path_bytes = record.path.to_string_lossy().into_owned().into_bytes();
    buf.extend_from_slice(&(path_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(&path_bytes);
    buf.extend_from_slice(&record.size.to_le_bytes());
    buf.extend_from_slice(&record.mtime_ns.to_le_bytes());
    buf.extend_from_slice(&record.device_id.to_le_bytes());
    match &record.digest {
        Some(digest) => {
            let (tag, bytes) = digest.key();
            buf.push(tag.as_str().len() as u8);
            buf.extend_from_slice(tag.as_str().as_bytes());
            buf.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(&bytes);
        }
        None => {
            buf.push(0);
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
    }
}

fn decode_groups(bytes: &[u8]) -> Result<Vec<DigestGroup>> {
    let mut cursor = Cursor::new(bytes);
    let group_count = cursor.read_u32()?;
    let mut groups = Vec::with_capacity(group_count as usize);
    for _ in 0..group_count {
        let id = cursor.read_u32()?;
        let record_count = cursor.read_u32()?;
        let mut records = Vec::with_capacity(record_count as usize);
        for _ in 0..record_count {
            records.push(decode_record(&mut cursor)?);
        }
        groups.push(DigestGroup { id, records });
    }
    Ok(groups)
}

fn decode_record(cursor: &mut Cursor) -> Result<FileRecord> {
    let path_len = cursor.read_u32()? as usize;
    let path_bytes = cursor.read_bytes(path_len)?;
    let path = String::from_utf8(path_bytes)
        .context("resume record path is not valid UTF-8")?
        .into();
    let size = cursor.read_u64()?;
    let mtime_ns = cursor.read_i64()?;
    let device_id = cursor.read_u64()?;

    let tag_len = cursor.read_u8()? as usize;
    let digest = if tag_len == 0 {
        let _ = cursor.read_u32()?;
        None
    } else {
        let tag_bytes = cursor.read_bytes(tag_len)?;
        let tag_str = String::from_utf8(tag_bytes).context("resume digest tag is not UTF-8")?;
        let tag = DigestTag::from_str(&tag_str)
            .with_context(|| format!("unknown digest tag `{tag_str}` in resume file"))?;
        let byte_len = cursor.read_u32()? as usize;
        let digest_bytes = cursor.read_bytes(byte_len)?;
        Some(digest_from_tag(tag, digest_bytes)?)
    };

    Ok(FileRecord {
        path,
        size,
        mtime_ns,
        digest,
        device_id,
    })
}

fn digest_from_tag(tag: DigestTag, bytes: Vec<u8>) -> Result<Digest> {
    Ok(match tag {
        DigestTag::Md5 => Digest::Strong {
            algorithm: Algorithm::Md5,
            bytes,
        },
        DigestTag::Sha256 => Digest::Strong {
            algorithm: Algorithm::Sha256,
            bytes,
        },
        DigestTag::Sha512 => Digest::Strong {
            algorithm: Algorithm::Sha512,
            bytes,
        },
        DigestTag::Fast => {
            if bytes.len() != 40 {
                bail!("malformed fast digest in resume file");
            }
            let mut size_bytes = [0u8; 8];
            size_bytes.copy_from_slice(&bytes[0..8]);
            let mut prefix = [0u8; 32];
            prefix.copy_from_slice(&bytes[8..40]);
            Digest::Fast {
                size: u64::from_be_bytes(size_bytes),
                prefix,
            }
        }
    })
}

/// A tiny forward-only byte cursor, just enough for the resume format's
/// fixed-width-then-length-prefixed fields.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        if self.pos + n > self.bytes.len() {
            bail!("resume group file truncated");
        }
        let slice = self.bytes[self.pos..self.pos + n].to_vec();
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes(b.try_into().unwrap()))
    }

    fn read_i64(&mut self) -> Result<i64> {
        let b = self.read_bytes(8)?;
        Ok(i64::from_le_bytes(b.try_into().unwrap()))
    }
}
