//! End-to-end: a small bot program driving the memory-mapped ports the way
//! a battle driver would see it.

use botcore_rs::asm::assemble;
use botcore_rs::cpu::ProcessState;
use botcore_rs::memory::ports;
use botcore_rs::parser::parse;
use botcore_rs::reg::Reg;
use botcore_rs::text::SourceText;

const BOT: &str = "\
; spin the sensor, fire when it reports an agent
start:
  ldb $x0, 0xE001        ; sensor kind
  ceq $x1, $x0, 1        ; agent in view?
  jmz $x1, @seek
  set $x2, 255
  stb $x2, 0xF002        ; full fire
  jmp @start
seek:
  ldb $x3, 0xF003
  add $x3, $x3, 8
  stb $x3, 0xF003        ; sweep the sensor
  stb $nl, 0xF002        ; hold fire
  jmp @start
";

fn boot(src: &str) -> ProcessState {
    let (prog, diags) = parse(&SourceText::new(src));
    assert!(diags.is_clean(), "{:?}", diags.errors);
    ProcessState::load(assemble(&prog).unwrap().memory.as_bytes())
}

#[test]
fn bot_sweeps_until_the_sensor_reports_an_agent() {
    let mut st = boot(BOT);

    // Nothing in view: the sensor direction sweeps, fire stays cold.
    for _ in 0..60 {
        st.step();
    }
    assert_eq!(st.mem.read_u8(ports::FIRE), 0);
    assert_ne!(st.mem.read_u8(ports::SENSOR_DIR), 0);

    // The driver reports an agent; the bot opens fire.
    st.mem.write_u8(ports::SENSOR_KIND, 1);
    for _ in 0..60 {
        st.step();
    }
    assert_eq!(st.mem.read_u8(ports::FIRE), 255);
}

#[test]
fn the_machine_never_halts() {
    let mut st = boot("spin:\nnop\njmp @spin\n");
    for _ in 0..10_000 {
        st.step();
    }
    // IP keeps cycling through the loop body.
    assert!(st.regs.get(Reg::Ip) <= 4);
}
