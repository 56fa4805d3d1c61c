//! Test-vector ingestion
//!
//! JSON data files carry the execution context and expected results for a
//! program: the modulus chain, twiddle tables, input/immediate values, and
//! the outputs and intermediates to validate against.

use crate::error::Result;
use pisa_spec::{Instruction, Opcode, Word};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TwiddleData {
    /// Per-residue forward twiddle factors
    #[serde(default)]
    pub ntt: Vec<Vec<Word>>,
    /// Inverse twiddle factors keyed by galois-element string
    #[serde(default)]
    pub intt: BTreeMap<String, Vec<Vec<Word>>>,
}

/// The full data file shape.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProgramData {
    #[serde(default)]
    pub modulus_chain: Vec<Word>,
    /// Two-param register root → flattened coefficient vector
    #[serde(default)]
    pub inputs: BTreeMap<String, Vec<Word>>,
    /// Immediate name → single value
    #[serde(default)]
    pub immediates: BTreeMap<String, Word>,
    #[serde(default)]
    pub twiddles: TwiddleData,
    #[serde(default)]
    pub outputs: BTreeMap<String, Vec<Word>>,
    #[serde(default)]
    pub intermediates: BTreeMap<String, Vec<Word>>,
}

impl ProgramData {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Synthesize a minimal context from the instruction stream itself, for
    /// running without a data file: modulus chain `1..=max_residue+1` and
    /// zero twiddle tables sized from the stream's NTT parameters.
    pub fn synthesized(instructions: &[Instruction]) -> Self {
        let mut max_residue = 0;
        let mut ntt_pmd = 0u32;
        let mut galois_elements = HashSet::new();
        for instr in instructions {
            max_residue = max_residue.max(instr.residue).max(instr.w_param.residue);
            match instr.opcode {
                Opcode::Ntt => ntt_pmd = ntt_pmd.max(instr.pmd),
                Opcode::Intt => {
                    ntt_pmd = ntt_pmd.max(instr.pmd);
                    galois_elements.insert(instr.galois_element);
                }
                _ => {}
            }
        }

        let modulus_chain = (1..=max_residue as Word + 1).collect();

        let mut twiddles = TwiddleData::default();
        if ntt_pmd != 0 {
            let factors = 1usize << (ntt_pmd - 1);
            twiddles.ntt = vec![vec![0; factors]; max_residue + 1];
            for galois in galois_elements {
                twiddles
                    .intt
                    .insert(galois.to_string(), twiddles.ntt.clone());
            }
        }

        ProgramData {
            modulus_chain,
            twiddles,
            ..ProgramData::default()
        }
    }
}
