//! TCP-MD5 signature option (RFC 2385) for outbound sockets.
//!
//! The key is installed with `TCP_MD5SIG_EXT` on the not-yet-connected
//! socket, so the SYN already carries the signature. Only Linux is
//! supported; elsewhere applying a key fails with `Unsupported`, which
//! surfaces as a dial failure for that connection.

use std::fmt;
use std::io;
use std::net::IpAddr;

use tokio::net::TcpSocket;

#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

use super::address::AddressFamily;

/// Maximum key length accepted by the kernel.
pub const TCP_MD5SIG_MAXKEYLEN: usize = 80;

#[cfg(target_os = "linux")]
const TCP_MD5SIG_EXT: libc::c_int = 32;

#[cfg(target_os = "linux")]
const TCP_MD5SIG_FLAG_PREFIX: u8 = 0x1;

/// Capability that signs a fresh outbound socket before it connects.
///
/// Implementations must be stateless across calls: one signer is shared by
/// every session.
pub trait ConnectionSigner: Send + Sync + fmt::Debug {
    fn apply(&self, socket: &TcpSocket, peer: IpAddr) -> io::Result<()>;
}

/// Shared secret plus the prefix it is scoped to.
#[derive(Clone, PartialEq, Eq)]
pub struct Md5Signature {
    key: Vec<u8>,
    prefix_len: Option<u8>,
}

impl Md5Signature {
    pub fn new(key: &[u8], prefix_len: Option<u8>) -> io::Result<Self> {
        // Bounded by the kernel's tcp_md5sig key buffer.
        if key.is_empty() || key.len() > TCP_MD5SIG_MAXKEYLEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "TCP MD5 key length must be between 1 and {} bytes",
                    TCP_MD5SIG_MAXKEYLEN
                ),
            ));
        }

        Ok(Self {
            key: key.to_vec(),
            prefix_len,
        })
    }

    /// Prefix length used for `peer`: the configured one, else the full
    /// address width.
    pub fn prefix_len_for(&self, peer: IpAddr) -> u8 {
        let family = match peer {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        };
        self.prefix_len.unwrap_or_else(|| family.full_prefix_len())
    }
}

impl fmt::Debug for Md5Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Md5Signature")
            .field("key", &format_args!("<{} bytes>", self.key.len()))
            .field("prefix_len", &self.prefix_len)
            .finish()
    }
}

impl ConnectionSigner for Md5Signature {
    fn apply(&self, socket: &TcpSocket, peer: IpAddr) -> io::Result<()> {
        configure_tcp_md5(socket, peer, self.prefix_len_for(peer), &self.key)
    }
}

#[cfg(target_os = "linux")]
#[repr(C)]
struct TcpMd5Sig {
    tcpm_addr: libc::sockaddr_storage,
    tcpm_flags: u8,
    tcpm_prefixlen: u8,
    tcpm_keylen: u16,
    tcpm_ifindex: i32,
    tcpm_key: [u8; TCP_MD5SIG_MAXKEYLEN],
}

#[cfg(target_os = "linux")]
fn sockaddr_storage_from_ip(addr: IpAddr) -> libc::sockaddr_storage {
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };

    match addr {
        IpAddr::V4(ip) => {
            let v4 = libc::sockaddr_in {
                sin_family: libc::AF_INET as libc::sa_family_t,
                sin_port: 0,
                sin_addr: libc::in_addr {
                    s_addr: u32::from(ip).to_be(),
                },
                sin_zero: [0; 8],
            };
            unsafe {
                std::ptr::copy_nonoverlapping(
                    &v4 as *const _ as *const u8,
                    &mut storage as *mut _ as *mut u8,
                    std::mem::size_of::<libc::sockaddr_in>(),
                );
            }
        }
        IpAddr::V6(ip) => {
            let v6 = libc::sockaddr_in6 {
                sin6_family: libc::AF_INET6 as libc::sa_family_t,
                sin6_port: 0,
                sin6_flowinfo: 0,
                sin6_addr: libc::in6_addr { s6_addr: ip.octets() },
                sin6_scope_id: 0,
            };
            unsafe {
                std::ptr::copy_nonoverlapping(
                    &v6 as *const _ as *const u8,
                    &mut storage as *mut _ as *mut u8,
                    std::mem::size_of::<libc::sockaddr_in6>(),
                );
            }
        }
    }

    storage
}

#[cfg(target_os = "linux")]
fn socket_family(fd: libc::c_int) -> io::Result<libc::sa_family_t> {
    let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };
    let mut len = std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t;
    let ret = unsafe {
        libc::getsockname(
            fd,
            &mut storage as *mut _ as *mut libc::sockaddr,
            &mut len,
        )
    };
    if ret == 0 {
        Ok(storage.ss_family as libc::sa_family_t)
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(target_os = "linux")]
pub fn configure_tcp_md5(
    socket: &TcpSocket,
    peer: IpAddr,
    prefix_len: u8,
    key: &[u8],
) -> io::Result<()> {
    let fd = socket.as_raw_fd();

    // The key is bound to an address family; it has to agree with the socket.
    let family = socket_family(fd)?;
    match (family, peer) {
        (val, IpAddr::V6(_)) if val == libc::AF_INET as libc::sa_family_t => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "socket is IPv4, cannot set TCP MD5 for IPv6 peer",
            ));
        }
        (val, IpAddr::V4(_)) if val == libc::AF_INET6 as libc::sa_family_t => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "socket is IPv6, cannot set TCP MD5 for IPv4 peer",
            ));
        }
        _ => {}
    }

    if key.len() > TCP_MD5SIG_MAXKEYLEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "TCP MD5 key length exceeds 80 bytes",
        ));
    }

    let mut md5sig = TcpMd5Sig {
        tcpm_addr: sockaddr_storage_from_ip(peer),
        tcpm_flags: TCP_MD5SIG_FLAG_PREFIX,
        tcpm_prefixlen: prefix_len,
        tcpm_keylen: key.len() as u16,
        tcpm_ifindex: 0,
        tcpm_key: [0u8; TCP_MD5SIG_MAXKEYLEN],
    };
    md5sig.tcpm_key[..key.len()].copy_from_slice(key);

    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::IPPROTO_TCP,
            TCP_MD5SIG_EXT,
            &md5sig as *const _ as *const libc::c_void,
            std::mem::size_of::<TcpMd5Sig>() as libc::socklen_t,
        )
    };

    if ret == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
pub fn configure_tcp_md5(
    _socket: &TcpSocket,
    _peer: IpAddr,
    _prefix_len: u8,
    _key: &[u8],
) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "TCP MD5 is only supported on Linux",
    ))
}
