//! # `.inf` sidecar files
//!
//! Archives of BBC files on a host file system carry the DFS attributes in
//! a one line `.inf` sidecar: file name, load address, exec address,
//! length, and an optional access token, addresses in hex without prefix.
//! Fields after the name are optional but ordered.
//!
//! This module only defines the line contract; when and where sidecars are
//! read or written is the business of the import and export commands.

use std::fmt;
use std::str::FromStr;
use crate::fs::Error;

/// Contents of one `.inf` line
#[derive(Clone,PartialEq,Eq,Debug)]
pub struct Inf {
    pub filename: String,
    pub load_addr: u32,
    pub exec_addr: Option<u32>,
    pub size: Option<u32>,
    pub locked: bool
}

impl Inf {
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            load_addr: 0,
            exec_addr: None,
            size: None,
            locked: false
        }
    }
}

impl FromStr for Inf {
    type Err = Error;
    fn from_str(line: &str) -> Result<Self,Self::Err> {
        let mut tokens = line.split_whitespace();
        let filename = match tokens.next() {
            Some(t) => t.to_string(),
            None => return Err(Error::NameInvalid)
        };
        let load_addr = match tokens.next() {
            Some(t) => parse_hex(t)?,
            None => 0
        };
        let mut ans = Self { filename, load_addr, exec_addr: None, size: None, locked: false };
        for (i,tok) in tokens.enumerate() {
            match (i,tok) {
                (_,"L") | (_,"Locked") => {
                    ans.locked = true;
                    break;
                },
                (0,t) => ans.exec_addr = Some(parse_hex(t)?),
                (1,t) => ans.size = Some(parse_hex(t)?),
                // trailing fields like dates are tolerated and ignored
                _ => break
            }
        }
        Ok(ans)
    }
}

impl fmt::Display for Inf {
    fn fmt(&self,f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f,"{:<12} {:06X}",self.filename,self.load_addr)?;
        if let Some(exec) = self.exec_addr {
            write!(f," {:06X}",exec)?;
        }
        if let Some(size) = self.size {
            write!(f," {:06X}",size)?;
        }
        if self.locked {
            write!(f," Locked")?;
        }
        Ok(())
    }
}

fn parse_hex(tok: &str) -> Result<u32,Error> {
    match u32::from_str_radix(tok,16) {
        Ok(v) => Ok(v),
        Err(_) => Err(Error::NameInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_line() {
        let inf = Inf::from_str("$.MENU   FF1900 FF8023 000128 L").unwrap();
        assert_eq!(inf.filename,"$.MENU");
        assert_eq!(inf.load_addr,0xFF1900);
        assert_eq!(inf.exec_addr,Some(0xFF8023));
        assert_eq!(inf.size,Some(0x128));
        assert!(inf.locked);
    }

    #[test]
    fn parse_short_line() {
        let inf = Inf::from_str("DATA 0000").unwrap();
        assert_eq!(inf.filename,"DATA");
        assert_eq!(inf.load_addr,0);
        assert_eq!(inf.exec_addr,None);
        assert!(!inf.locked);
    }

    #[test]
    fn render_roundtrip() {
        let mut inf = Inf::new("$.GAME");
        inf.load_addr = 0x1900;
        inf.exec_addr = Some(0x8023);
        inf.size = Some(100);
        inf.locked = true;
        let line = inf.to_string();
        assert_eq!(line,"$.GAME       001900 008023 000064 Locked");
        assert_eq!(Inf::from_str(&line).unwrap(),inf);
    }

    #[test]
    fn reject_bad_hex() {
        assert!(Inf::from_str("X GG").is_err());
        assert!(Inf::from_str("").is_err());
    }
}
