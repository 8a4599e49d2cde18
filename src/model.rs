//! Owned identity records and the JSON/snapshot codecs around them.
//!
//! Records here own their strings. Marshaling into a caller-supplied buffer
//! (the host's fixed calling convention) lives in `buffer`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

use crate::consts::{DEFAULT_SHELL, HOME_PREFIX, SNAPSHOT_FIELDS};

/// A passwd-equivalent identity record. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Passwd {
    #[serde(rename = "username")]
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    #[serde(default)]
    pub gecos: String,
    #[serde(rename = "homeDirectory", default)]
    pub dir: String,
    #[serde(default)]
    pub shell: String,
}

impl Passwd {
    /// Fill defaults the directory is allowed to omit.
    fn normalize(mut self) -> Self {
        if self.dir.is_empty() {
            self.dir = format!("{}{}", HOME_PREFIX, self.name);
        }
        if self.shell.is_empty() {
            self.shell = DEFAULT_SHELL.to_string();
        }
        self
    }
}

/// A group record with its ordered member list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

/// Base group attributes without the member list (membership queries).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GroupRef {
    pub name: String,
    pub gid: u32,
}

/// The dimension along which a lookup is issued: numeric id or name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupKey<'a> {
    Id(u32),
    Name(&'a str),
}

// -------- JSON decode (remote directory payloads) --------

#[derive(Deserialize)]
struct UsernamesBody {
    usernames: Vec<String>,
}

#[derive(Deserialize)]
struct GroupsBody {
    groups: Vec<GroupRef>,
}

#[derive(Deserialize)]
struct UsersPageBody {
    users: Vec<Passwd>,
}

pub fn decode_passwd(body: &[u8]) -> Result<Passwd> {
    let p: Passwd = serde_json::from_slice(body).context("decode user record")?;
    Ok(p.normalize())
}

pub fn decode_group_ref(body: &[u8]) -> Result<GroupRef> {
    serde_json::from_slice(body).context("decode group record")
}

pub fn decode_usernames(body: &[u8]) -> Result<Vec<String>> {
    let b: UsernamesBody = serde_json::from_slice(body).context("decode member list")?;
    Ok(b.usernames)
}

pub fn decode_group_refs(body: &[u8]) -> Result<Vec<GroupRef>> {
    let b: GroupsBody = serde_json::from_slice(body).context("decode group list")?;
    Ok(b.groups)
}

pub fn decode_users_page(body: &[u8]) -> Result<Vec<Passwd>> {
    let b: UsersPageBody = serde_json::from_slice(body).context("decode users page")?;
    Ok(b.users.into_iter().map(Passwd::normalize).collect())
}

// -------- Snapshot line codec --------
// Одна строка = одна запись: name:passwd:uid:gid:gecos:home:shell.

pub fn parse_snapshot_line(line: &str) -> Result<Passwd> {
    let fields: Vec<&str> = line.splitn(SNAPSHOT_FIELDS, ':').collect();
    if fields.len() != SNAPSHOT_FIELDS {
        return Err(anyhow!(
            "snapshot line has {} fields, expected {}",
            fields.len(),
            SNAPSHOT_FIELDS
        ));
    }
    let uid: u32 = fields[2]
        .parse()
        .with_context(|| format!("bad uid field '{}'", fields[2]))?;
    let gid: u32 = fields[3]
        .parse()
        .with_context(|| format!("bad gid field '{}'", fields[3]))?;
    Ok(Passwd {
        name: fields[0].to_string(),
        uid,
        gid,
        gecos: fields[4].to_string(),
        dir: fields[5].to_string(),
        shell: fields[6].to_string(),
    })
}

pub fn format_snapshot_line(p: &Passwd) -> String {
    format!(
        "{}:x:{}:{}:{}:{}:{}",
        p.name, p.uid, p.gid, p.gecos, p.dir, p.shell
    )
}
