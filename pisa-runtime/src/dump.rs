//! Memory dump serialization
//!
//! Line-oriented CSV capturing the full device state:
//!
//! ```text
//! ntt,<residue>,v0,v1,…
//! intt,<galois>,<residue>,v0,v1,…
//! modulus_chain,v0,v1,…
//! memory,<location>,v0,v1,…
//! ```
//!
//! The reader tolerates trailing carriage returns and empty fields, and
//! parses values as unsigned 32-bit integers so dumps produced by the engine
//! reload bit-for-bit.

use crate::engine::FunctionalModel;
use crate::error::{Result, RuntimeError};
use crate::multi_register::MultiRegister;
use pisa_spec::Word;
use std::io::{BufRead, Write};

impl FunctionalModel {
    /// Write the twiddle tables, modulus chain, and every memory register.
    pub fn dump_memory<W: Write>(&self, out: &mut W) -> Result<()> {
        for (residue, factors) in self.twiddle_ntt().iter().enumerate() {
            write!(out, "ntt,{residue}")?;
            for value in factors {
                write!(out, ",{value}")?;
            }
            writeln!(out)?;
        }

        let mut galois_keys: Vec<&String> = self.twiddle_intt().keys().collect();
        galois_keys.sort();
        for galois in galois_keys {
            for (residue, factors) in self.twiddle_intt()[galois].iter().enumerate() {
                write!(out, "intt,{galois},{residue}")?;
                for value in factors {
                    write!(out, ",{value}")?;
                }
                writeln!(out)?;
            }
        }

        write!(out, "modulus_chain")?;
        for value in self.modulus_chain() {
            write!(out, ",{value}")?;
        }
        writeln!(out)?;

        for (location, register) in self.memory().registers() {
            let mut line = format!("memory,{location}");
            register.to_csv(&mut line);
            writeln!(out, "{line}")?;
        }

        Ok(())
    }

    /// Write only the registers named in `addresses`, in the given order.
    pub fn dump_memory_addresses<W: Write>(
        &mut self,
        out: &mut W,
        addresses: &[String],
    ) -> Result<()> {
        for address in addresses {
            let register = self.memory_mut().read(address).clone();
            let mut line = format!("memory,{address}");
            register.to_csv(&mut line);
            writeln!(out, "{line}")?;
        }
        Ok(())
    }

    /// Restore device state from a dump produced by [`dump_memory`].
    ///
    /// [`dump_memory`]: FunctionalModel::dump_memory
    pub fn read_memory<R: BufRead>(&mut self, input: R) -> Result<()> {
        for (number, line) in input.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line
                .split(',')
                .map(|f| f.trim_end_matches('\r'))
                .filter(|f| !f.is_empty())
                .collect();

            let malformed = |reason: String| RuntimeError::MalformedDump {
                line: number + 1,
                reason,
            };

            match fields.first().copied() {
                None => continue,
                Some("memory") => {
                    let location = fields
                        .get(1)
                        .ok_or_else(|| malformed("missing memory location".into()))?;
                    let values = parse_values(&fields[2..], number + 1)?;
                    self.memory_mut()
                        .write(location, MultiRegister::from(values));
                }
                Some("modulus_chain") => {
                    let values = parse_values(&fields[1..], number + 1)?;
                    self.set_modulus_chain(values);
                }
                Some("ntt") => {
                    let residue: usize = fields
                        .get(1)
                        .and_then(|f| f.parse().ok())
                        .ok_or_else(|| malformed("missing ntt residue".into()))?;
                    let values = parse_values(&fields[2..], number + 1)?;

                    let mut tables = self.twiddle_ntt().to_vec();
                    if tables.len() <= residue {
                        tables.resize(residue + 1, Vec::new());
                    }
                    tables[residue] = values;
                    self.set_twiddle_ntt(tables);
                }
                Some("intt") => {
                    let galois = fields
                        .get(1)
                        .ok_or_else(|| malformed("missing intt galois element".into()))?
                        .to_string();
                    let residue: usize = fields
                        .get(2)
                        .and_then(|f| f.parse().ok())
                        .ok_or_else(|| malformed("missing intt residue".into()))?;
                    let values = parse_values(&fields[3..], number + 1)?;

                    let mut tables = self.twiddle_intt().clone();
                    let entry = tables.entry(galois).or_default();
                    if entry.len() <= residue {
                        entry.resize(residue + 1, Vec::new());
                    }
                    entry[residue] = values;
                    self.set_twiddle_intt(tables);
                }
                Some(other) => {
                    return Err(malformed(format!("unknown record kind {other:?}")));
                }
            }
        }
        Ok(())
    }
}

fn parse_values(fields: &[&str], line: usize) -> Result<Vec<Word>> {
    fields
        .iter()
        .map(|f| {
            f.parse::<Word>().map_err(|_| RuntimeError::MalformedDump {
                line,
                reason: format!("non-numeric value {f:?}"),
            })
        })
        .collect()
}
