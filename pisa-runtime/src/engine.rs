//! Functional execution engine
//!
//! Decodes and executes every P-ISA instruction against the device memory,
//! using the modulus chain and twiddle tables set before execution. The
//! elementwise ops run their per-element loops through rayon; the NTT stages
//! write scattered indices and stay sequential.

use crate::arith::{montgomery_add, mul_mod, reverse_bits};
use crate::error::{Result, RuntimeError};
use crate::memory::MemoryModel;
use crate::multi_register::MultiRegister;
use crate::trace::InstructionTrace;
use pisa_spec::{Instruction, Opcode, Word, DEFAULT_REGISTER_WIDTH};
use rayon::prelude::*;
use std::collections::HashMap;

/// iNTT twiddle tables keyed by galois-element string, one table per residue.
pub type TwiddleMap = HashMap<String, Vec<Vec<Word>>>;

/// Functional model of the P-ISA device.
#[derive(Debug, Default, Clone)]
pub struct FunctionalModel {
    memory: MemoryModel,
    modulus_chain: Vec<Word>,
    twiddle_ntt: Vec<Vec<Word>>,
    twiddle_intt: TwiddleMap,
    bit_reverse: Vec<u32>,
    start_table: Vec<usize>,
    register_width: usize,
    montgomery: bool,
    trace_enabled: bool,
    execution_trace: Vec<InstructionTrace>,
}

impl FunctionalModel {
    pub fn new() -> Self {
        Self::with_register_width(DEFAULT_REGISTER_WIDTH)
    }

    pub fn with_register_width(register_width: usize) -> Self {
        FunctionalModel {
            memory: MemoryModel::new(register_width),
            modulus_chain: Vec::new(),
            twiddle_ntt: Vec::new(),
            twiddle_intt: TwiddleMap::new(),
            bit_reverse: Vec::new(),
            start_table: Vec::new(),
            register_width,
            montgomery: true,
            trace_enabled: false,
            execution_trace: Vec::new(),
        }
    }

    pub fn register_width(&self) -> usize {
        self.register_width
    }

    /// Select the multiply reduction: Montgomery (the hardware's `k = q-2`
    /// form, for pre-encoded HE data) or the plain widened product.
    pub fn set_montgomery_enabled(&mut self, enabled: bool) {
        self.montgomery = enabled;
    }

    pub fn montgomery_enabled(&self) -> bool {
        self.montgomery
    }

    pub fn modulus_chain(&self) -> &[Word] {
        &self.modulus_chain
    }

    pub fn set_modulus_chain(&mut self, chain: Vec<Word>) {
        self.modulus_chain = chain;
    }

    pub fn twiddle_ntt(&self) -> &[Vec<Word>] {
        &self.twiddle_ntt
    }

    pub fn set_twiddle_ntt(&mut self, twiddle: Vec<Vec<Word>>) {
        self.twiddle_ntt = twiddle;
    }

    pub fn twiddle_intt(&self) -> &TwiddleMap {
        &self.twiddle_intt
    }

    pub fn set_twiddle_intt(&mut self, twiddle: TwiddleMap) {
        self.twiddle_intt = twiddle;
    }

    pub fn memory(&self) -> &MemoryModel {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut MemoryModel {
        &mut self.memory
    }

    /// Enable tracing, discarding any previously captured entries.
    pub fn enable_execution_trace(&mut self) {
        self.execution_trace.clear();
        self.trace_enabled = true;
    }

    pub fn stop_execution_trace(&mut self) {
        self.trace_enabled = false;
    }

    pub fn execution_trace(&self) -> &[InstructionTrace] {
        &self.execution_trace
    }

    /// Write every captured trace entry to the diagnostic sink.
    pub fn flush_execution_trace(&self, max_values: usize) {
        for entry in &self.execution_trace {
            entry.log(max_values);
        }
    }

    /// Decode an instruction into its implementation and execute it,
    /// capturing operand snapshots around the call when tracing is enabled.
    pub fn decode(&mut self, instr: &Instruction) -> Result<()> {
        if self.trace_enabled {
            let mut entry = InstructionTrace::new(instr.clone());
            let inputs = instr
                .inputs
                .iter()
                .map(|op| self.memory.read(op.location()).clone())
                .collect();
            entry.set_inputs(inputs);
            self.execution_trace.push(entry);
        }

        let result = match instr.opcode {
            Opcode::Add => self.exec_add(instr),
            Opcode::Sub => self.exec_sub(instr),
            Opcode::Mul => self.exec_mul(instr),
            Opcode::Muli => self.exec_muli(instr),
            Opcode::Mac => self.exec_mac(instr),
            Opcode::Maci => self.exec_maci(instr),
            Opcode::Copy => self.exec_copy(instr),
            Opcode::Ntt => self.exec_ntt(instr),
            Opcode::Intt => self.exec_intt(instr),
        };

        if let Err(err) = result {
            tracing::error!(instruction = %instr, error = %err, "failed to decode instruction");
            return Err(err);
        }

        if self.trace_enabled {
            let outputs = instr
                .outputs
                .iter()
                .map(|op| self.memory.read(op.location()).clone())
                .collect();
            if let Some(entry) = self.execution_trace.last_mut() {
                entry.set_outputs(outputs);
            }
        }

        Ok(())
    }

    fn modulus(&self, residue: usize) -> Result<Word> {
        self.modulus_chain
            .get(residue)
            .copied()
            .ok_or(RuntimeError::MissingResidue {
                residue,
                chain_len: self.modulus_chain.len(),
            })
    }

    /// Snapshot an operand register at the configured width.
    fn fetch(&mut self, location: &str) -> Vec<Word> {
        self.memory.entry(location).data().to_vec()
    }

    /// Scalar immediate: element 0 of the width-1 register at `location`.
    fn fetch_immediate(&mut self, location: &str) -> Word {
        self.memory.entry(location).data()[0]
    }

    fn exec_add(&mut self, instr: &Instruction) -> Result<()> {
        let modulus = self.modulus(instr.residue)?;
        let src1 = self.fetch(instr.inputs[0].location());
        let src2 = self.fetch(instr.inputs[1].location());

        let out: Vec<Word> = src1
            .par_iter()
            .zip(src2.par_iter())
            .map(|(&a, &b)| montgomery_add(a, b, modulus))
            .collect();

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(out));
        Ok(())
    }

    fn exec_sub(&mut self, instr: &Instruction) -> Result<()> {
        let modulus = self.modulus(instr.residue)?;
        let src1 = self.fetch(instr.inputs[0].location());
        let src2 = self.fetch(instr.inputs[1].location());

        let out: Vec<Word> = src1
            .par_iter()
            .zip(src2.par_iter())
            .map(|(&a, &b)| {
                let mut z = modulus.wrapping_sub(b);
                if z >= modulus {
                    z = z.wrapping_sub(modulus);
                }
                montgomery_add(a, z, modulus)
            })
            .collect();

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(out));
        Ok(())
    }

    fn exec_mul(&mut self, instr: &Instruction) -> Result<()> {
        let modulus = self.modulus(instr.residue)?;
        let montgomery = self.montgomery;
        let src1 = self.fetch(instr.inputs[0].location());
        let src2 = self.fetch(instr.inputs[1].location());

        let out: Vec<Word> = src1
            .par_iter()
            .zip(src2.par_iter())
            .map(|(&a, &b)| mul_mod(a, b, modulus, montgomery))
            .collect();

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(out));
        Ok(())
    }

    fn exec_muli(&mut self, instr: &Instruction) -> Result<()> {
        let modulus = self.modulus(instr.residue)?;
        let montgomery = self.montgomery;
        let src1 = self.fetch(instr.inputs[0].location());
        let imm = self.fetch_immediate(instr.inputs[1].location());

        let out: Vec<Word> = src1
            .par_iter()
            .map(|&a| mul_mod(a, imm, modulus, montgomery))
            .collect();

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(out));
        Ok(())
    }

    fn exec_mac(&mut self, instr: &Instruction) -> Result<()> {
        let modulus = self.modulus(instr.residue)?;
        let montgomery = self.montgomery;
        let accum = self.fetch(instr.inputs[0].location());
        let src1 = self.fetch(instr.inputs[1].location());
        let src2 = self.fetch(instr.inputs[2].location());

        let out: Vec<Word> = accum
            .par_iter()
            .zip(src1.par_iter().zip(src2.par_iter()))
            .map(|(&acc, (&a, &b))| {
                let tmp = mul_mod(a, b, modulus, montgomery);
                montgomery_add(acc, tmp, modulus)
            })
            .collect();

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(out));
        Ok(())
    }

    fn exec_maci(&mut self, instr: &Instruction) -> Result<()> {
        let modulus = self.modulus(instr.residue)?;
        let montgomery = self.montgomery;
        let accum = self.fetch(instr.inputs[0].location());
        let src1 = self.fetch(instr.inputs[1].location());
        let imm = self.fetch_immediate(instr.inputs[2].location());

        let out: Vec<Word> = accum
            .par_iter()
            .zip(src1.par_iter())
            .map(|(&acc, &a)| {
                let tmp = mul_mod(a, imm, modulus, montgomery);
                montgomery_add(acc, tmp, modulus)
            })
            .collect();

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(out));
        Ok(())
    }

    fn exec_copy(&mut self, instr: &Instruction) -> Result<()> {
        let value = self.memory.copy(instr.inputs[0].location())?;
        self.memory.write(instr.outputs[0].location(), value);
        Ok(())
    }

    /// NTT butterfly geometry shared by both transform directions.
    fn ntt_geometry(&mut self, instr: &Instruction) -> NttGeometry {
        let ln = instr.pmd;
        let n = 1usize << ln;
        let half_n = n >> 1;
        let half_block = self.register_width;
        let block_size = half_block * 2;
        let increment = 1usize << ln.saturating_sub(14);

        if self.bit_reverse.is_empty() {
            self.generate_bit_reverse_table(n as u32, ln);
        }

        NttGeometry {
            ln,
            half_n,
            half_block,
            block_size,
            increment,
        }
    }

    fn exec_ntt(&mut self, instr: &Instruction) -> Result<()> {
        let geometry = self.ntt_geometry(instr);
        let residue = instr.w_param.residue;
        let modulus = self.modulus(residue)?;
        let stage = instr.w_param.stage;
        let montgomery = self.montgomery;

        if self.start_table.is_empty() {
            self.start_table = create_start_table(geometry.increment);
        }
        let start = self
            .start_table
            .get(instr.w_param.block)
            .copied()
            .ok_or_else(|| {
                RuntimeError::UnsupportedConfiguration(format!(
                    "ntt block {} exceeds the start table ({} blocks)",
                    instr.w_param.block,
                    self.start_table.len()
                ))
            })?;

        let src_top = self.fetch(instr.inputs[0].location());
        let src_bot = self.fetch(instr.inputs[1].location());
        let mut dst_top = self.fetch(instr.outputs[0].location());
        let mut dst_bot = self.fetch(instr.outputs[1].location());

        // Stage 0 skips the twiddle multiply entirely, so the table is only
        // required from stage 1 on.
        let twiddle = if stage == 0 {
            None
        } else {
            Some(
                self.twiddle_ntt
                    .get(residue)
                    .ok_or(RuntimeError::MissingNttTwiddle { residue })?,
            )
        };

        let NttGeometry {
            ln,
            half_n,
            half_block,
            block_size,
            increment,
        } = geometry;

        let mut i = start;
        while i < half_n {
            let j = self.bit_reverse[i] as usize;

            let in0 = (2 * j) % block_size;
            let in1 = (2 * j + 1) % block_size;
            let out0 = j % half_block;
            let out1 = ((j + half_n) % half_block) + half_block;

            let sp = ln - 1 - stage;
            let k = (j >> sp) << sp;

            let xin_0 = read_split(&src_top, &src_bot, half_block, in0);
            let xin_1 = read_split(&src_top, &src_bot, half_block, in1);

            let t0 = xin_0;
            let t1 = match twiddle {
                None => xin_1,
                Some(factors) => {
                    let w = factors
                        .get(k)
                        .copied()
                        .ok_or(RuntimeError::MissingNttTwiddle { residue })?;
                    mul_mod(xin_1, w, modulus, montgomery)
                }
            };
            let t2 = modulus.wrapping_sub(t1);

            write_split(&mut dst_top, &mut dst_bot, half_block, out0, montgomery_add(t0, t1, modulus));
            write_split(&mut dst_top, &mut dst_bot, half_block, out1, montgomery_add(t0, t2, modulus));

            i += increment;
        }

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(dst_top));
        self.memory
            .write(instr.outputs[1].location(), MultiRegister::from(dst_bot));
        Ok(())
    }

    fn exec_intt(&mut self, instr: &Instruction) -> Result<()> {
        let geometry = self.ntt_geometry(instr);
        let residue = instr.w_param.residue;
        let modulus = self.modulus(residue)?;
        let stage = instr.w_param.stage;
        let montgomery = self.montgomery;
        let galois = instr.galois_element.to_string();

        let src_top = self.fetch(instr.inputs[0].location());
        let src_bot = self.fetch(instr.inputs[1].location());
        let mut dst_top = self.fetch(instr.outputs[0].location());
        let mut dst_bot = self.fetch(instr.outputs[1].location());

        let twiddle = self
            .twiddle_intt
            .get(&galois)
            .ok_or_else(|| RuntimeError::MissingGaloisTable {
                galois: galois.clone(),
            })?
            .get(residue)
            .ok_or_else(|| RuntimeError::MissingInttTwiddle {
                galois: galois.clone(),
                residue,
            })?;

        let NttGeometry {
            ln,
            half_n,
            half_block,
            block_size,
            increment,
        } = geometry;

        // Dense slice of the index space, one slice per block.
        let slice_size = half_n / increment;
        let start = instr.w_param.block * slice_size;
        let end = start + slice_size;

        for i in start..end {
            let j = self.bit_reverse[i] as usize;

            let in0 = i % half_block;
            let in1 = ((i + half_n) % half_block) + half_block;
            let out0 = (2 * i) % block_size;
            let out1 = (2 * i + 1) % block_size;

            let sp = ln - 1 - stage;
            let k = (j >> sp) << sp;

            let xin_0 = read_split(&src_top, &src_bot, half_block, in0);
            let xin_1 = read_split(&src_top, &src_bot, half_block, in1);

            let w = twiddle
                .get(k)
                .copied()
                .ok_or_else(|| RuntimeError::MissingInttTwiddle {
                    galois: galois.clone(),
                    residue,
                })?;

            let t0 = xin_0;
            let t1 = mul_mod(xin_1, w, modulus, montgomery);
            // Montgomery post-condition: t1 is already reduced.
            debug_assert!(t1 < modulus, "unreduced twiddle product {t1} >= {modulus}");
            let t2 = modulus.wrapping_sub(t1);

            write_split(&mut dst_top, &mut dst_bot, half_block, out0, montgomery_add(t0, t1, modulus));
            write_split(&mut dst_top, &mut dst_bot, half_block, out1, montgomery_add(t0, t2, modulus));
        }

        self.memory
            .write(instr.outputs[0].location(), MultiRegister::from(dst_top));
        self.memory
            .write(instr.outputs[1].location(), MultiRegister::from(dst_bot));
        Ok(())
    }

    fn generate_bit_reverse_table(&mut self, n: u32, ln: u32) {
        self.bit_reverse = (0..n).map(|x| reverse_bits(x, ln - 1)).collect();
    }

    /// Device registers in `root_<i>_<j>_<slice>` form matching a 2-param
    /// `root_<i>_<j>` name.
    pub fn matching_3param_register_names(&self, two_param_root: &str) -> Vec<String> {
        self.memory
            .registers()
            .filter_map(|(name, _)| {
                let cut = name.rfind('_')?;
                (&name[..cut] == two_param_root).then(|| name.to_string())
            })
            .collect()
    }
}

struct NttGeometry {
    ln: u32,
    half_n: usize,
    half_block: usize,
    block_size: usize,
    increment: usize,
}

#[inline]
fn read_split(top: &[Word], bot: &[Word], half_block: usize, index: usize) -> Word {
    if index < half_block {
        top[index]
    } else {
        bot[index - half_block]
    }
}

#[inline]
fn write_split(top: &mut [Word], bot: &mut [Word], half_block: usize, index: usize, value: Word) {
    if index < half_block {
        top[index] = value;
    } else {
        bot[index - half_block] = value;
    }
}

/// Staggered start offsets for the forward transform, interleaved by eights:
/// `[0,8,16,..] ++ [4,12,..] ++ [2,10,..] ++ [6,14,..] ++ [1,9,..] ++
/// [5,13,..] ++ [3,11,..] ++ [7,15,..]`.
fn create_start_table(increment: usize) -> Vec<usize> {
    let mut table = Vec::with_capacity(increment.max(1));
    for first in [0, 4, 2, 6, 1, 5, 3, 7] {
        let mut x = first;
        while x < increment {
            table.push(x);
            x += 8;
        }
    }
    if table.is_empty() {
        table.push(0);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use pisa_spec::Operand;

    fn model(width: usize, chain: Vec<Word>) -> FunctionalModel {
        let mut model = FunctionalModel::with_register_width(width);
        model.set_modulus_chain(chain);
        model.set_montgomery_enabled(false);
        model
    }

    fn load(model: &mut FunctionalModel, name: &str, values: Vec<Word>) {
        model.memory_mut().write(name, MultiRegister::from(values));
    }

    #[test]
    fn test_add_mod_seven() {
        let mut m = model(4, vec![0, 7]);
        load(&mut m, "a", vec![1, 2, 3, 4]);
        load(&mut m, "b", vec![6, 5, 4, 3]);
        let instr = Instruction::add(14, Operand::new("c"), Operand::new("a"), Operand::new("b"), 1);
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("c").data(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_sub_mod_seven() {
        let mut m = model(4, vec![0, 7]);
        load(&mut m, "a", vec![1, 2, 3, 4]);
        load(&mut m, "b", vec![6, 5, 4, 3]);
        let instr = Instruction::sub(14, Operand::new("d"), Operand::new("a"), Operand::new("b"), 1);
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("d").data(), &[2, 4, 6, 1]);
    }

    #[test]
    fn test_mul_mod_seven() {
        let mut m = model(4, vec![0, 7]);
        load(&mut m, "a", vec![1, 2, 3, 4]);
        load(&mut m, "b", vec![6, 5, 4, 3]);
        let instr = Instruction::mul(14, Operand::new("e"), Operand::new("a"), Operand::new("b"), 1);
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("e").data(), &[6, 3, 5, 5]);
    }

    #[test]
    fn test_muli_immediate() {
        let mut m = model(2, vec![0, 17]);
        load(&mut m, "a", vec![5, 10]);
        load(&mut m, "k", vec![3]);
        let instr = Instruction::muli(
            14,
            Operand::new("f"),
            Operand::new("a"),
            Operand::new("k"),
            1,
        );
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("f").data(), &[15, 13]);
    }

    #[test]
    fn test_mac_accumulates_in_place() {
        let mut m = model(4, vec![0, 11]);
        load(&mut m, "dst", vec![2, 2, 2, 2]);
        load(&mut m, "a", vec![1, 2, 3, 4]);
        load(&mut m, "b", vec![1, 1, 1, 1]);
        let instr = Instruction::mac(
            14,
            Operand::new("dst"),
            Operand::new("a"),
            Operand::new("b"),
            1,
        );
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("dst").data(), &[3, 4, 5, 6]);
    }

    #[test]
    fn test_maci_uses_scalar() {
        let mut m = model(2, vec![0, 11]);
        load(&mut m, "dst", vec![1, 1]);
        load(&mut m, "a", vec![3, 4]);
        load(&mut m, "k", vec![2]);
        let instr = Instruction::maci(
            14,
            Operand::new("dst"),
            Operand::new("a"),
            Operand::new("k"),
            1,
        );
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("dst").data(), &[7, 9]);
    }

    #[test]
    fn test_copy_duplicates_register() {
        let mut m = model(3, vec![0]);
        load(&mut m, "s", vec![4, 5, 6]);
        let instr = Instruction::copy(14, Operand::new("d"), Operand::new("s"));
        m.decode(&instr).unwrap();
        assert_eq!(m.memory_mut().read("d").data(), &[4, 5, 6]);
    }

    #[test]
    fn test_copy_fails_on_missing_source() {
        let mut m = model(3, vec![0]);
        let instr = Instruction::copy(14, Operand::new("d"), Operand::new("nowhere"));
        assert!(matches!(
            m.decode(&instr),
            Err(RuntimeError::MissingRegister(_))
        ));
    }

    #[test]
    fn test_missing_residue_is_fatal() {
        let mut m = model(2, vec![7]);
        load(&mut m, "a", vec![1, 2]);
        load(&mut m, "b", vec![1, 2]);
        let instr = Instruction::add(14, Operand::new("c"), Operand::new("a"), Operand::new("b"), 5);
        assert!(matches!(
            m.decode(&instr),
            Err(RuntimeError::MissingResidue { residue: 5, .. })
        ));
    }

    #[test]
    fn test_trace_captures_snapshots() {
        let mut m = model(2, vec![0, 7]);
        m.enable_execution_trace();
        load(&mut m, "a", vec![1, 2]);
        load(&mut m, "b", vec![3, 4]);
        let instr = Instruction::add(14, Operand::new("c"), Operand::new("a"), Operand::new("b"), 1);
        m.decode(&instr).unwrap();

        let trace = m.execution_trace();
        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].inputs()[0].data(), &[1, 2]);
        assert_eq!(trace[0].inputs()[1].data(), &[3, 4]);
        assert_eq!(trace[0].outputs()[0].data(), &[4, 6]);
    }

    #[test]
    fn test_enable_trace_clears_previous_entries() {
        let mut m = model(2, vec![0, 7]);
        m.enable_execution_trace();
        load(&mut m, "a", vec![1, 1]);
        load(&mut m, "b", vec![1, 1]);
        let instr = Instruction::add(14, Operand::new("c"), Operand::new("a"), Operand::new("b"), 1);
        m.decode(&instr).unwrap();
        assert_eq!(m.execution_trace().len(), 1);
        m.enable_execution_trace();
        assert!(m.execution_trace().is_empty());
    }

    #[test]
    fn test_start_table_interleaving() {
        assert_eq!(
            create_start_table(16),
            vec![0, 8, 4, 12, 2, 10, 6, 14, 1, 9, 5, 13, 3, 11, 7, 15]
        );
        assert_eq!(create_start_table(1), vec![0]);
    }

    #[test]
    fn test_matching_3param_names() {
        let mut m = model(2, vec![0]);
        load(&mut m, "ct_0_0_0", vec![1, 2]);
        load(&mut m, "ct_0_0_1", vec![3, 4]);
        load(&mut m, "ct_0_1_0", vec![5, 6]);
        let mut names = m.matching_3param_register_names("ct_0_0");
        names.sort();
        assert_eq!(names, vec!["ct_0_0_0", "ct_0_0_1"]);
    }
}
