//! End-to-end functional execution over parsed instruction streams, using
//! plain modular arithmetic so results are checkable against schoolbook
//! math for small moduli.

use pisa_assembler::parse_program;
use pisa_runtime::{MultiRegister, ProgramRuntime};
use pisa_spec::Word;

fn runtime(width: usize, chain: Vec<Word>) -> ProgramRuntime {
    let mut runtime = ProgramRuntime::with_register_width(width);
    runtime.model_mut().set_montgomery_enabled(false);
    runtime.set_modulus_chain(chain);
    runtime
}

fn write(runtime: &mut ProgramRuntime, name: &str, values: Vec<Word>) {
    runtime
        .model_mut()
        .memory_mut()
        .write(name, MultiRegister::from(values));
}

fn read(runtime: &mut ProgramRuntime, name: &str) -> Vec<Word> {
    runtime.model_mut().memory_mut().read(name).data().to_vec()
}

#[test]
fn test_add_sub_mul_mod_seven() {
    let mut rt = runtime(4, vec![0, 7]);
    write(&mut rt, "a", vec![1, 2, 3, 4]);
    write(&mut rt, "b", vec![6, 5, 4, 3]);

    let program = parse_program(
        "14, add, c, a, b, 1\n14, sub, d, a, b, 1\n14, mul, e, a, b, 1\n",
    )
    .unwrap();
    rt.execute_program(&program).unwrap();

    assert_eq!(read(&mut rt, "c"), vec![0, 0, 0, 0]);
    assert_eq!(read(&mut rt, "d"), vec![2, 4, 6, 1]);
    assert_eq!(read(&mut rt, "e"), vec![6, 3, 5, 5]);
}

#[test]
fn test_muli_with_immediate() {
    let mut rt = runtime(2, vec![0, 17]);
    write(&mut rt, "a", vec![5, 10]);
    rt.set_immediate("k", 3);

    let program = parse_program("14, muli, f, a, k, 1\n").unwrap();
    rt.execute_program(&program).unwrap();

    assert_eq!(read(&mut rt, "f"), vec![15, 13]);
}

#[test]
fn test_mac_aliases_destination() {
    let mut rt = runtime(4, vec![0, 11]);
    write(&mut rt, "dst", vec![2, 2, 2, 2]);
    write(&mut rt, "a", vec![1, 2, 3, 4]);
    write(&mut rt, "b", vec![1, 1, 1, 1]);

    let program = parse_program("14, mac, dst, a, b, 1\n").unwrap();
    rt.execute_program(&program).unwrap();

    assert_eq!(read(&mut rt, "dst"), vec![3, 4, 5, 6]);
}

#[test]
fn test_modular_identities_elementwise() {
    // add/sub/mul agree with schoolbook modular arithmetic across a
    // register for a modulus near the top of the supported range.
    let q: Word = 2_147_483_647; // 2^31 - 1
    let width = 64;
    let a: Vec<Word> = (0..width as Word).map(|x| x.wrapping_mul(97_003_571) % q).collect();
    let b: Vec<Word> = (0..width as Word).map(|x| x.wrapping_mul(193_877_777) % q).collect();

    let mut rt = runtime(width, vec![q]);
    write(&mut rt, "a", a.clone());
    write(&mut rt, "b", b.clone());

    let program = parse_program(
        "14, add, s, a, b, 0\n14, sub, d, a, b, 0\n14, mul, p, a, b, 0\n",
    )
    .unwrap();
    rt.execute_program(&program).unwrap();

    let sum = read(&mut rt, "s");
    let diff = read(&mut rt, "d");
    let prod = read(&mut rt, "p");
    for x in 0..width {
        let (av, bv) = (a[x] as u64, b[x] as u64);
        assert_eq!(sum[x] as u64, (av + bv) % q as u64, "add at {x}");
        assert_eq!(diff[x] as u64, (av + q as u64 - bv) % q as u64, "sub at {x}");
        assert_eq!(prod[x] as u64, av * bv % q as u64, "mul at {x}");
    }
}

#[test]
fn test_copy_preserves_values_and_fails_on_missing() {
    let mut rt = runtime(3, vec![0]);
    write(&mut rt, "src", vec![9, 8, 7]);

    let program = parse_program("14, copy, dst, src\n").unwrap();
    rt.execute_program(&program).unwrap();
    assert_eq!(read(&mut rt, "dst"), vec![9, 8, 7]);

    let bad = parse_program("14, copy, dst2, never_written\n").unwrap();
    assert!(rt.execute_program(&bad).is_err());
}

#[test]
fn test_trace_records_dispatch_order() {
    let mut rt = runtime(2, vec![0, 7]);
    rt.set_debug_mode(true);
    write(&mut rt, "a", vec![1, 2]);
    write(&mut rt, "b", vec![3, 4]);

    let program = parse_program("14, add, c, a, b, 1\n14, mul, d, c, a, 1\n").unwrap();
    rt.execute_program(&program).unwrap();

    let trace = rt.model().execution_trace();
    assert_eq!(trace.len(), 2);
    assert_eq!(trace[0].instruction().opcode, pisa_spec::Opcode::Add);
    assert_eq!(trace[1].instruction().opcode, pisa_spec::Opcode::Mul);
    // The second entry's first input is the first entry's output.
    assert_eq!(trace[1].inputs()[0].data(), trace[0].outputs()[0].data());
}

#[test]
fn test_trace_survives_fatal_error() {
    let mut rt = runtime(2, vec![0, 7]);
    rt.set_debug_mode(true);
    write(&mut rt, "a", vec![1, 2]);
    write(&mut rt, "b", vec![3, 4]);

    // Second instruction references a residue beyond the chain.
    let program = parse_program("14, add, c, a, b, 1\n14, add, d, c, b, 9\n").unwrap();
    assert!(rt.execute_program(&program).is_err());
    // Both entries were captured before the failure surfaced.
    assert_eq!(rt.model().execution_trace().len(), 2);
}
