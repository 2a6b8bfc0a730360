use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};

use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum EndpointError {
    #[error("Address length {requested} exceeds the storage capacity of {max}")]
    LengthOutOfRange { requested: usize, max: usize },

    #[error("Unsupported address family: {0}")]
    UnsupportedFamily(libc::sa_family_t),

    #[error("No address present")]
    Unset,
}

// A peer address as the kernel sees it: a sockaddr_storage plus the number of
// leading bytes that are meaningful. The length is what gets written into
// msg_namelen before a transfer and what the kernel's reported length resizes
// after a receive.
#[derive(Clone, Copy)]
pub struct Endpoint {
    storage: libc::sockaddr_storage,
    len: libc::socklen_t,
}

impl Endpoint {

    // An endpoint with no address. Translates to a null msg_name, which is
    // what connected-socket sends and address-less receives want.
    pub fn unset() -> Self {
        Self {
            storage: unsafe { std::mem::zeroed() },
            len: 0,
        }
    }

    // An endpoint opened to its full storage capacity, ready for the kernel
    // to write a peer address of any supported family into it on receive.
    pub fn unspecified() -> Self {
        Self {
            storage: unsafe { std::mem::zeroed() },
            len: Self::capacity() as libc::socklen_t,
        }
    }

    pub const fn capacity() -> usize {
        std::mem::size_of::<libc::sockaddr_storage>()
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_unset(&self) -> bool {
        self.len == 0
    }

    pub fn family(&self) -> libc::sa_family_t {
        self.storage.ss_family
    }

    pub fn data_ptr(&self) -> *const libc::sockaddr {
        &self.storage as *const libc::sockaddr_storage as *const libc::sockaddr
    }

    pub fn data_mut_ptr(&mut self) -> *mut libc::sockaddr {
        &mut self.storage as *mut libc::sockaddr_storage as *mut libc::sockaddr
    }

    // Adjusts the meaningful length after the kernel reported how much of the
    // storage it filled in. socklen_t is unsigned, so only the upper bound
    // needs checking.
    pub fn resize(&mut self, new_len: usize) -> Result<(), EndpointError> {
        if new_len > Self::capacity() {
            return Err(EndpointError::LengthOutOfRange {
                requested: new_len,
                max: Self::capacity(),
            });
        }
        self.len = new_len as libc::socklen_t;
        Ok(())
    }

    // Decodes the stored address into a typed socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, EndpointError> {
        if self.is_unset() {
            return Err(EndpointError::Unset);
        }

        let family = self.storage.ss_family;

        if family == libc::AF_INET as libc::sa_family_t {
            let addr_in = unsafe {
                *(&self.storage as *const libc::sockaddr_storage
                    as *const libc::sockaddr_in)
            };

            Ok(SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::from(u32::from_be(addr_in.sin_addr.s_addr)),
                u16::from_be(addr_in.sin_port),
            )))
        } else if family == libc::AF_INET6 as libc::sa_family_t {
            let addr_in6 = unsafe {
                *(&self.storage as *const libc::sockaddr_storage
                    as *const libc::sockaddr_in6)
            };

            Ok(SocketAddr::V6(SocketAddrV6::new(
                Ipv6Addr::from(addr_in6.sin6_addr.s6_addr),
                u16::from_be(addr_in6.sin6_port),
                addr_in6.sin6_flowinfo,
                addr_in6.sin6_scope_id,
            )))
        } else {
            Err(EndpointError::UnsupportedFamily(family))
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::unset()
    }
}

impl From<SocketAddr> for Endpoint {
    fn from(addr: SocketAddr) -> Self {
        let mut storage: libc::sockaddr_storage = unsafe { std::mem::zeroed() };

        let len = match addr {
            SocketAddr::V4(v4) => {
                let addr_in = libc::sockaddr_in {
                    sin_family: libc::AF_INET as libc::sa_family_t,
                    sin_port: v4.port().to_be(),
                    sin_addr: libc::in_addr {
                        s_addr: u32::from(*v4.ip()).to_be(),
                    },
                    sin_zero: [0; 8],
                };

                unsafe {
                    let storage_ptr = &mut storage as *mut _ as *mut libc::sockaddr_in;
                    std::ptr::write(storage_ptr, addr_in);
                }

                std::mem::size_of::<libc::sockaddr_in>()
            },
            SocketAddr::V6(v6) => {
                let addr_in6 = libc::sockaddr_in6 {
                    sin6_family: libc::AF_INET6 as libc::sa_family_t,
                    sin6_port: v6.port().to_be(),
                    sin6_addr: libc::in6_addr {
                        s6_addr: v6.ip().octets(),
                    },
                    sin6_flowinfo: v6.flowinfo(),
                    sin6_scope_id: v6.scope_id(),
                };

                unsafe {
                    let storage_ptr = &mut storage as *mut _ as *mut libc::sockaddr_in6;
                    std::ptr::write(storage_ptr, addr_in6);
                }

                std::mem::size_of::<libc::sockaddr_in6>()
            },
        };

        Self {
            storage,
            len: len as libc::socklen_t,
        }
    }
}

impl From<IpAddr> for Endpoint {
    fn from(ip: IpAddr) -> Self {
        Endpoint::from(SocketAddr::new(ip, 0))
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket_addr() {
            Ok(addr) => write!(f, "Endpoint({addr})"),
            Err(EndpointError::Unset) => write!(f, "Endpoint(unset)"),
            Err(_) => write!(f, "Endpoint(family {}, {} bytes)", self.family(), self.len()),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket_addr() {
            Ok(addr) => write!(f, "{addr}"),
            Err(_) => write!(f, "<unset>"),
        }
    }
}
