// Copyright 2025 Jonas Kruckenberg
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use alloc::string::String;
use core::str::FromStr;

use anyhow::{anyhow, bail};
use log::LevelFilter;
use remanence::{Action, Mode};

/// Options passed to the image on its command line, e.g.
/// `decay-efi.efi log=debug;mode=compare;results=\results\cold-room.csv;after=shutdown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootargs {
    pub log: LevelFilter,
    /// Phase to run without asking.
    pub mode: Option<Mode>,
    /// Path of the result file on the boot volume.
    pub results: Option<String>,
    /// What to do after the pass, `None` means ask.
    pub after: Option<Action>,
}

impl Default for Bootargs {
    fn default() -> Self {
        Self {
            log: LevelFilter::Info,
            mode: None,
            results: None,
            after: None,
        }
    }
}

impl Bootargs {
    /// Parses the load options of the image.
    ///
    /// When started from the UEFI shell the options begin with the name of the image, which is
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if an option has a malformed value.
    pub fn from_load_options(options: &str) -> anyhow::Result<Self> {
        let options = options.trim();
        let args = match options.split_once(char::is_whitespace) {
            Some((first, rest)) if !first.contains('=') => rest,
            None if !options.contains('=') => "",
            _ => options,
        };

        Self::from_str(args)
    }
}

impl FromStr for Bootargs {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut args = Self::default();

        let parts = s.trim().split(';').map(str::trim).filter(|p| !p.is_empty());
        for part in parts {
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| anyhow!("expected key=value, found {part:?}"))?;

            match key {
                "log" => {
                    args.log = LevelFilter::from_str(value)
                        .map_err(|_| anyhow!("invalid log level {value:?}"))?;
                }
                "mode" => {
                    args.mode = Some(
                        Mode::from_str(value).map_err(|_| anyhow!("invalid mode {value:?}"))?,
                    );
                }
                "results" => {
                    if value.is_empty() {
                        bail!("results path must not be empty");
                    }
                    args.results = Some(value.replace('/', "\\"));
                }
                "after" => {
                    args.after = match value {
                        "prompt" => None,
                        _ => Some(
                            Action::from_str(value)
                                .map_err(|_| anyhow!("invalid action {value:?}"))?,
                        ),
                    };
                }
                _ => log::warn!("ignoring unknown option {key:?}"),
            }
        }

        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        assert_eq!(Bootargs::from_str("").unwrap(), Bootargs::default());
        assert_eq!(
            Bootargs::from_load_options("decay-efi.efi").unwrap(),
            Bootargs::default()
        );
    }

    #[test]
    fn all_options() {
        let args = Bootargs::from_load_options(
            r"decay-efi.efi log=trace; mode=exclude;results=/runs/a.csv;after=shutdown;",
        )
        .unwrap();

        assert_eq!(
            args,
            Bootargs {
                log: LevelFilter::Trace,
                mode: Some(Mode::Exclude),
                results: Some(String::from(r"\runs\a.csv")),
                after: Some(Action::Shutdown),
            }
        );
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let args = Bootargs::from_str("color=never;after=prompt;log=OFF").unwrap();
        assert_eq!(args.log, LevelFilter::Off);
        assert_eq!(args.after, None);
    }

    #[test]
    fn malformed_values() {
        for s in ["log=loud", "mode=4", "after=sleep", "results=", "verbose"] {
            assert!(Bootargs::from_str(s).is_err(), "{s} parsed");
        }
    }
}
