//! End-to-end scenarios: compile source text, run it on the machine,
//! check the output bytes.

use bytec_lang::prelude::*;
use bytec_vm::prelude::{run_program, Emulator, EmulatorError, Isa};
use rstest::rstest;

fn run_source(source: &str) -> Vec<u8> {
    let code = compile_source(source).expect("program compiles");
    run_program(&code, None).expect("program halts")
}

fn run_body(source: &str) -> Vec<u8> {
    let code = compile_body(source).expect("script compiles");
    run_program(&code, None).expect("script halts")
}

#[test]
fn an_empty_script_prints_nothing() {
    assert_eq!(run_body(""), Vec::<u8>::new());
}

#[test]
fn prints_a_constant() {
    assert_eq!(
        run_source("def main():\n  print(68)\n"),
        vec![68]
    );
}

#[test]
fn locals_hold_their_values() {
    let output = run_body(
        "
    var1 = 2
    var2 = var1
    var1 = 1

    print(var2)
    print(var1)
    ",
    );
    assert_eq!(output, vec![2, 1]);
}

#[test]
fn reassignment_overwrites() {
    let output = run_body(
        "
    var1 = 3
    print(var1)
    var1 = 5
    print(var1)
    ",
    );
    assert_eq!(output, vec![3, 5]);
}

#[test]
fn a_variable_can_step_itself() {
    let output = run_body(
        "
    var = 3
    print(var)
    var=var+1
    print(var)
    ",
    );
    assert_eq!(output, vec![3, 4]);
}

#[test]
fn addition_in_both_operand_shapes() {
    assert_eq!(
        run_body("\n    var1 = 5+10\n    print(var1)\n"),
        vec![15]
    );
    assert_eq!(
        run_body("\n    var1=6\n    print(6+var1)\n"),
        vec![12]
    );
}

#[rstest]
#[case("10", "5", '+', 15)]
#[case("10", "5", '-', 5)]
#[case("var1", "10", '+', 22)]
#[case("var1", "10", '-', 2)]
#[case("25", "var2", '+', 45)]
#[case("25", "var2", '-', 5)]
#[case("var2", "var1", '+', 32)]
#[case("var2", "var1", '-', 8)]
fn mixed_operand_combinations(
    #[case] first: &str,
    #[case] second: &str,
    #[case] operator: char,
    #[case] expected: u8,
) {
    let source = format!(
        "
    var1=12
    var2 = 20

    print({first} {operator} {second})
    "
    );
    assert_eq!(run_body(&source), vec![expected]);
}

#[test]
fn while_counts_down() {
    let output = run_source(
        "
def main():
  var = 5
  while var:
    print(var)
    var = var - 1
",
    );
    assert_eq!(output, vec![5, 4, 3, 2, 1]);
}

#[test]
fn if_takes_only_the_live_branch() {
    let output = run_body(
        "
    if 0:
      print(0)
    if 1:
      print(1)
    ",
    );
    assert_eq!(output, vec![1]);
}

#[test]
fn nested_ifs_inside_loops() {
    assert_eq!(
        run_body(
            "
    if 1:
      print(1)
      if 0:
        print(0)
      print(2)
    ",
        ),
        vec![1, 2]
    );

    assert_eq!(
        run_body(
            "
    a=3
    while a:
      if a-2:
        print(8)
      print(a)
      a=a-1
    ",
        ),
        vec![8, 3, 2, 8, 1]
    );
}

#[test]
fn if_else_alternates_on_the_condition() {
    let output = run_source(
        "
def main():
  a = 5
  while a:
    if a - 3:
      print(0)
    else:
      print(1)
    a = a - 1
",
    );
    assert_eq!(output, vec![0, 0, 1, 0, 0]);
}

#[test]
fn calls_run_in_statement_order() {
    let output = run_source(
        "
def test1():
  print(5)

def test2():
  print(10)

def main():
  test1()
  test2()
  print(3)
",
    );
    assert_eq!(output, vec![5, 10, 3]);
}

#[test]
fn a_parameter_reaches_the_callee() {
    let output = run_source(
        "
def test(val):
  print(val)


def main():
  test(5)
  print(1)
",
    );
    assert_eq!(output, vec![5, 1]);
}

#[test]
fn parameters_are_pushed_left_to_right() {
    let output = run_source(
        "
def test(param1,param2):
  print(param2)
  print(param1)

def main():
  print(5)
  test(10,6)
  print(7)
",
    );
    assert_eq!(output, vec![5, 6, 10, 7]);
}

#[test]
fn argument_expressions_and_forwarding() {
    let output = run_source(
        "
def test(arg):
  print(arg)

def test2(arg):
  test(arg + 5)

def main():
  v = 5
  test(v)
  test2(10)
  test2(v)
",
    );
    assert_eq!(output, vec![5, 15, 10]);
}

#[test]
fn callee_locals_and_parameters_coexist() {
    let output = run_source(
        "
def test(arg1,arg2,arg3):
  v = arg1+arg2
  print(v+arg3)

def main():
  test(1,2,3)
  test(1,1,2)
",
    );
    assert_eq!(output, vec![6, 4]);
}

#[test]
fn an_endless_loop_exhausts_the_cycle_budget() {
    let code = compile_source(
        "
def main():
  while 1:
    print(5)
",
    )
    .unwrap();

    assert!(matches!(
        run_program(&code, None),
        Err(EmulatorError::CyclesExceeded(_))
    ));
}

#[test]
fn fibonacci_first_ten_terms() {
    let output = run_source(
        "
def main():
  a = 1
  b = 0
  c = 0
  counter = 0
  while 10 - counter:
    print(a)
    c = a + b
    b = a
    a = c
    counter = counter + 1
",
    );
    assert_eq!(output, vec![1, 1, 2, 3, 5, 8, 13, 21, 34, 55]);
}

#[test]
fn assigning_to_result_returns_it() {
    let output = run_source(
        "
def mul(a,b):byte
  result=0
  while b:
    result=result+a
    b=b-1

def main():
  print(mul(0,10))
  print(mul(4,5))
  print(mul(10,0))
",
    );
    assert_eq!(output, vec![0, 20, 0]);
}

#[test]
fn return_hands_back_a_value() {
    let output = run_source(
        "
def test():byte
  return 5

def main():
  a=test()
  print(a)
",
    );
    assert_eq!(output, vec![5]);
}

#[test]
fn returned_values_feed_further_calls() {
    assert_eq!(
        run_source(
            "
def add(val1,val2):byte
  return val1+val2

def main():
  print(add(1,2))
  print(add(0,0))
",
        ),
        vec![3, 0]
    );

    assert_eq!(
        run_source(
            "
def add2(val1,val2):byte
  return val1+val2

def add3(v1,v2,v3):byte
  return add2(v1,add2(v2,v3))

def main():
  print(add3(1,2,4))
  print(add3(5,6,7))
  print(add3(1,0,0))
",
        ),
        vec![7, 18, 1]
    );
}

#[test]
fn return_exits_the_function_early() {
    let output = run_source(
        "
def pick(flag):byte
  if flag:
    return 1
  return 2

def main():
  print(pick(1))
  print(pick(0))
",
    );
    assert_eq!(output, vec![1, 2]);
}

#[test]
fn struct_members_live_side_by_side() {
    let output = run_source(
        "
struct type1:
  member1:byte
  member2:byte

def main():
  a:type1

  a.member2=5
  a.member1=a.member2+3

  print(a.member1)
  print(a.member2)
",
    );
    assert_eq!(output, vec![8, 5]);
}

#[test]
fn reruns_reproduce_the_output() {
    let code = compile_source(
        "
def main():
  a = 1
  b = 0
  c = 0
  counter = 0
  while 10 - counter:
    print(a)
    c = a + b
    b = a
    a = c
    counter = counter + 1
",
    )
    .unwrap();

    let isa = Isa::default();
    let mut vm = Emulator::new(isa.set);

    vm.set_all_memory(&code).unwrap();
    vm.run().unwrap();
    let first = vm.take_output();

    vm.reset();
    vm.set_all_memory(&code).unwrap();
    vm.run().unwrap();
    let second = vm.take_output();

    assert_eq!(first, second);
    assert_eq!(first, vec![1, 1, 2, 3, 5, 8, 13, 21, 34, 55]);
}
