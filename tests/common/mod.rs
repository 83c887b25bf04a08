//! In-memory 9P2000.L server used as a transport in tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use virtio9p::{Error, Transport};

pub const RLERROR: u8 = 7;
pub const TLOPEN: u8 = 12;
pub const TGETATTR: u8 = 24;
pub const TREADDIR: u8 = 40;
pub const TVERSION: u8 = 100;
pub const TATTACH: u8 = 104;
pub const TWALK: u8 = 110;
pub const TREAD: u8 = 116;
pub const TCLUNK: u8 = 120;
pub const NO_TAG: u16 = 0xFFFF;

const ENOENT: u32 = 2;
const EBADF: u32 = 9;
const EIO: u32 = 5;

pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

#[derive(Clone, Debug)]
enum Node {
    File(Vec<u8>),
    Dir,
}

/// One request as seen by the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Seen {
    pub msg_type: u8,
    pub tag: u16,
}

struct State {
    nodes: BTreeMap<String, Node>,
    fids: HashMap<u32, String>,
    msize: u32,
    version: String,
    fail_on: Option<u8>,
    seen: Vec<Seen>,
}

/// Cloneable handle: one clone goes into the driver, the test keeps another.
#[derive(Clone)]
pub struct MockServer {
    state: Arc<Mutex<State>>,
}

impl MockServer {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(String::new(), Node::Dir);
        Self {
            state: Arc::new(Mutex::new(State {
                nodes,
                fids: HashMap::new(),
                msize: 0x0008_0000,
                version: String::from("9P2000.L"),
                fail_on: None,
                seen: Vec::new(),
            })),
        }
    }

    pub fn with_file(self, path: &str, data: &[u8]) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let path = normalize(path);
            add_parents(&mut state.nodes, &path);
            state.nodes.insert(path, Node::File(data.to_vec()));
        }
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let path = normalize(path);
            add_parents(&mut state.nodes, &path);
            state.nodes.insert(path, Node::Dir);
        }
        self
    }

    pub fn with_msize(self, msize: u32) -> Self {
        self.state.lock().unwrap().msize = msize;
        self
    }

    pub fn with_version(self, version: &str) -> Self {
        self.state.lock().unwrap().version = version.to_string();
        self
    }

    /// Answer every request of `msg_type` with Rlerror from now on.
    pub fn fail_on(&self, msg_type: u8) {
        self.state.lock().unwrap().fail_on = Some(msg_type);
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.lock().unwrap().seen.clone()
    }

    pub fn count(&self, msg_type: u8) -> usize {
        self.seen().iter().filter(|s| s.msg_type == msg_type).count()
    }

    pub fn clear_seen(&self) {
        self.state.lock().unwrap().seen.clear();
    }

    pub fn bound_fids(&self) -> usize {
        self.state.lock().unwrap().fids.len()
    }

    /// Names directly inside `dir`, in listing order.
    pub fn children(&self, dir: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        children(&state.nodes, &normalize(dir))
    }
}

impl Transport for MockServer {
    fn send_paired(&self, req: &[u8], resp: &mut [u8]) -> Result<usize, Error> {
        let mut state = self.state.lock().unwrap();
        let mut r = Reader { buf: req, pos: 0 };
        let size = r.u32() as usize;
        assert_eq!(size, req.len(), "declared size must match request length");
        let msg_type = r.u8();
        let tag = r.u16();
        state.seen.push(Seen { msg_type, tag });

        let body = if state.fail_on == Some(msg_type) {
            Err(EIO)
        } else {
            state.handle(msg_type, &mut r)
        };
        let reply = match body {
            Ok(body) => frame(msg_type + 1, tag, &body),
            Err(errno) => frame(RLERROR, tag, &errno.to_le_bytes()),
        };
        let n = reply.len().min(resp.len());
        resp[..n].copy_from_slice(&reply[..n]);
        Ok(n)
    }
}

impl State {
    fn handle(&mut self, msg_type: u8, r: &mut Reader<'_>) -> Result<Vec<u8>, u32> {
        let mut out = Vec::new();
        match msg_type {
            TVERSION => {
                let _proposed = r.u32();
                let _version = r.str();
                out.extend_from_slice(&self.msize.to_le_bytes());
                push_str(&mut out, &self.version);
            }
            TATTACH => {
                let fid = r.u32();
                assert_eq!(r.u32(), u32::MAX, "afid");
                let uname = r.str();
                assert_eq!(uname.len(), 8);
                let _aname = r.str();
                let _n_uname = r.u32();
                self.fids.insert(fid, String::new());
                out.extend_from_slice(&qid(0x80, 0));
            }
            TWALK => {
                let fid = r.u32();
                let new_fid = r.u32();
                let n = r.u16() as usize;
                let mut path = self.fids.get(&fid).cloned().ok_or(EBADF)?;
                let mut qids = Vec::new();
                for _ in 0..n {
                    let name = r.str();
                    let next = if path.is_empty() {
                        name
                    } else {
                        format!("{path}/{name}")
                    };
                    let Some(node) = self.nodes.get(&next) else {
                        break;
                    };
                    qids.push(qid(node_type(node), qids.len() as u64 + 1));
                    path = next;
                }
                if n > 0 && qids.is_empty() {
                    return Err(ENOENT);
                }
                if qids.len() == n {
                    self.fids.insert(new_fid, path);
                }
                out.extend_from_slice(&(qids.len() as u16).to_le_bytes());
                for q in qids {
                    out.extend_from_slice(&q);
                }
            }
            TLOPEN => {
                let fid = r.u32();
                assert_eq!(r.u32(), 0, "read-only open");
                let path = self.fids.get(&fid).ok_or(EBADF)?;
                let node = self.nodes.get(path).ok_or(ENOENT)?;
                out.extend_from_slice(&qid(node_type(node), 0));
                out.extend_from_slice(&0u32.to_le_bytes());
            }
            TGETATTR => {
                let fid = r.u32();
                let _mask = r.u64();
                let path = self.fids.get(&fid).ok_or(EBADF)?;
                let size = match self.nodes.get(path).ok_or(ENOENT)? {
                    Node::File(data) => data.len() as u64,
                    Node::Dir => 0,
                };
                out.extend_from_slice(&0x7ffu64.to_le_bytes());
                out.extend_from_slice(&qid(0, 0));
                out.extend_from_slice(&[0u8; 4 * 3 + 8 * 2]);
                out.extend_from_slice(&size.to_le_bytes());
                out.extend_from_slice(&[0u8; 8 * 12]);
            }
            TREAD => {
                let fid = r.u32();
                let offset = r.u64() as usize;
                let count = r.u32() as usize;
                let path = self.fids.get(&fid).ok_or(EBADF)?;
                let Some(Node::File(data)) = self.nodes.get(path) else {
                    return Err(EBADF);
                };
                let start = offset.min(data.len());
                let end = (start + count).min(data.len());
                out.extend_from_slice(&((end - start) as u32).to_le_bytes());
                out.extend_from_slice(&data[start..end]);
            }
            TREADDIR => {
                let fid = r.u32();
                let offset = r.u64() as usize;
                let count = r.u32() as usize;
                let path = self.fids.get(&fid).ok_or(EBADF)?;
                let mut data = Vec::new();
                for (idx, name) in children(&self.nodes, path).iter().enumerate().skip(offset) {
                    let mut rec = qid(0, idx as u64).to_vec();
                    rec.extend_from_slice(&(idx as u64 + 1).to_le_bytes());
                    rec.push(0);
                    push_str(&mut rec, name);
                    if data.len() + rec.len() > count {
                        break;
                    }
                    data.extend(rec);
                }
                out.extend_from_slice(&(data.len() as u32).to_le_bytes());
                out.extend(data);
            }
            TCLUNK => {
                let fid = r.u32();
                self.fids.remove(&fid).ok_or(EBADF)?;
            }
            other => panic!("unexpected request type {other}"),
        }
        Ok(out)
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Reader<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let out = self.buf[self.pos..self.pos + N].try_into().unwrap();
        self.pos += N;
        out
    }
    fn u8(&mut self) -> u8 {
        self.take::<1>()[0]
    }
    fn u16(&mut self) -> u16 {
        u16::from_le_bytes(self.take())
    }
    fn u32(&mut self) -> u32 {
        u32::from_le_bytes(self.take())
    }
    fn u64(&mut self) -> u64 {
        u64::from_le_bytes(self.take())
    }
    fn str(&mut self) -> String {
        let len = self.u16() as usize;
        let s = String::from_utf8(self.buf[self.pos..self.pos + len].to_vec()).unwrap();
        self.pos += len;
        s
    }
}

fn frame(msg_type: u8, tag: u16, body: &[u8]) -> Vec<u8> {
    let mut out = ((7 + body.len()) as u32).to_le_bytes().to_vec();
    out.push(msg_type);
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(body);
    out
}

fn push_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u16).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

fn qid(type_: u8, path: u64) -> [u8; 13] {
    let mut q = [0u8; 13];
    q[0] = type_;
    q[5..].copy_from_slice(&path.to_le_bytes());
    q
}

fn node_type(node: &Node) -> u8 {
    match node {
        Node::Dir => 0x80,
        Node::File(_) => 0,
    }
}

fn normalize(path: &str) -> String {
    path.split('/').filter(|p| !p.is_empty()).collect::<Vec<_>>().join("/")
}

fn add_parents(nodes: &mut BTreeMap<String, Node>, path: &str) {
    let mut parent = String::new();
    let parts: Vec<&str> = path.split('/').collect();
    for part in &parts[..parts.len().saturating_sub(1)] {
        if !parent.is_empty() {
            parent.push('/');
        }
        parent.push_str(part);
        nodes.entry(parent.clone()).or_insert(Node::Dir);
    }
}

fn children(nodes: &BTreeMap<String, Node>, dir: &str) -> Vec<String> {
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };
    nodes
        .keys()
        .filter_map(|key| key.strip_prefix(&prefix))
        .filter(|rest| !rest.is_empty() && !rest.contains('/'))
        .map(str::to_string)
        .collect()
}
