//! YSF reflector hosts file
//!
//! The registry export is one reflector per line, semicolon separated:
//! `id;name;description;address;port;...`. Trailing fields are ignored.

use std::fs;
use std::io;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct YsfReflector {
    pub id: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Default)]
pub struct YsfReflectors {
    reflectors: Vec<YsfReflector>,
}

impl YsfReflectors {
    /// Parse the hosts file contents. Malformed lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let mut reflectors = Vec::new();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split(';').collect();
            if fields.len() < 5 {
                continue;
            }

            let port = match fields[4].trim().parse::<u16>() {
                Ok(port) => port,
                Err(_) => {
                    tracing::warn!("bad port in hosts file line: {}", line);
                    continue;
                }
            };

            reflectors.push(YsfReflector {
                id: fields[0].trim().to_string(),
                name: fields[1].trim().to_string(),
                description: fields[2].trim().to_string(),
                address: fields[3].trim().to_string(),
                port,
            });
        }

        Self { reflectors }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let contents = fs::read_to_string(&path)?;
        let reflectors = Self::parse(&contents);
        tracing::info!(
            "loaded {} YSF reflectors from {}",
            reflectors.len(),
            path.as_ref().display()
        );
        Ok(reflectors)
    }

    /// Look a reflector up by name, ignoring case and padding.
    pub fn find_by_name(&self, name: &str) -> Option<&YsfReflector> {
        let wanted = name.trim().to_uppercase();
        self.reflectors.iter().find(|r| r.name.to_uppercase() == wanted)
    }

    pub fn len(&self) -> usize {
        self.reflectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reflectors.is_empty()
    }
}
