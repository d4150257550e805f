//! The default instruction set.
//!
//! Registration order fixes the opcode ids (`invalid` is pinned at
//! 0), but nothing outside this module may rely on the numeric
//! values: programs are built symbolically through the instruction
//! handles on [`Isa`].

use bytec_asm::{Instruction, InstructionSet, RegistryError};

use crate::emulator::Emulator;

/// An instruction bound to the bytec machine.
pub type Op = Instruction<Emulator>;

/// The default instruction table plus one handle per instruction for
/// symbolic encoding.
pub struct Isa {
    /// The registered table, ready to hand to an [`Emulator`].
    pub set: InstructionSet<Emulator>,

    /// Reserved opcode 0; executing it faults.
    pub invalid: Op,
    /// Halts the machine (`EXIT`).
    pub exit: Op,
    /// Emits the low byte of `A` (`OUT`).
    pub out: Op,
    /// Loads an immediate into `A` (`LDA #val`).
    pub lda: Op,
    /// Loads an immediate into `FP` (`LDFP #val`).
    pub ldfp: Op,
    /// Loads an immediate into `SP` (`LDSP #val`).
    pub ldsp: Op,
    /// Copies `SP` into `FP` (`LDFP SP`).
    pub ldfp_sp: Op,
    /// Loads from above the frame pointer (`LDA FP, #offset`).
    pub lda_fp: Op,
    /// Loads from below the frame pointer (`LDA FP, -#offset`).
    pub lda_fp_back: Op,
    /// Stores above the frame pointer (`STA FP, #offset`).
    pub sta_fp: Op,
    /// Stores below the frame pointer (`STA FP, -#offset`).
    pub sta_fp_back: Op,
    /// Adds an immediate to `A` (`ADDA #val`).
    pub adda: Op,
    /// Adds a frame byte to `A` (`ADDA FP, #offset`).
    pub adda_fp: Op,
    /// Adds a frame byte below `FP` to `A` (`ADDA FP, -#offset`).
    pub adda_fp_back: Op,
    /// Subtracts an immediate from `A` (`SUBA #val`).
    pub suba: Op,
    /// Subtracts a frame byte from `A` (`SUBA FP, #offset`).
    pub suba_fp: Op,
    /// Subtracts a frame byte below `FP` from `A` (`SUBA FP, -#offset`).
    pub suba_fp_back: Op,
    /// Releases stack space (`ADDSP #val`).
    pub addsp: Op,
    /// Allocates stack space (`SUBSP #val`).
    pub subsp: Op,
    /// Pushes the low byte of `A` (`PUSHA`).
    pub pusha: Op,
    /// Pops into `A` (`POPA`).
    pub popa: Op,
    /// Pushes `FP` and `PC`, points `FP` at the new frame and jumps
    /// (`CALL #addr`).
    pub call: Op,
    /// Unwinds a frame without locals (`RET`).
    pub ret: Op,
    /// Unwinds a frame with `size` bytes of locals (`RETFS #size`).
    pub retfs: Op,
    /// Jumps unconditionally (`JMP #addr`).
    pub jmp: Op,
    /// Latches the zero flag from `A` (`TSTA`).
    pub tsta: Op,
    /// Jumps if the zero flag is set (`JMPZ #addr`).
    pub jmpz: Op,
}

impl Isa {
    /// Build and register the default table.
    pub fn try_new() -> Result<Self, RegistryError> {
        let mut set = InstructionSet::new();

        let invalid = set.register(
            Instruction::new("invalid", exec::invalid)
                .with_id(0)
                .with_group("control"),
        )?;
        let exit = set.register(Instruction::new("EXIT", exec::exit).with_group("control"))?;
        let out = set.register(Instruction::new("OUT", exec::out).with_group("io"))?;

        let lda = set.register(Instruction::new("LDA #val", exec::lda).with_group("load"))?;
        let ldfp = set.register(Instruction::new("LDFP #val", exec::ldfp).with_group("load"))?;
        let ldsp = set.register(Instruction::new("LDSP #val", exec::ldsp).with_group("load"))?;
        let ldfp_sp = set.register(Instruction::new("LDFP SP", exec::ldfp_sp).with_group("load"))?;
        let lda_fp =
            set.register(Instruction::new("LDA FP, #offset", exec::lda_fp).with_group("load"))?;
        let lda_fp_back = set.register(
            Instruction::new("LDA FP, -#offset", exec::lda_fp_back).with_group("load"),
        )?;

        let sta_fp =
            set.register(Instruction::new("STA FP, #offset", exec::sta_fp).with_group("store"))?;
        let sta_fp_back = set.register(
            Instruction::new("STA FP, -#offset", exec::sta_fp_back).with_group("store"),
        )?;

        let adda = set.register(Instruction::new("ADDA #val", exec::adda).with_group("arithmetic"))?;
        let adda_fp = set.register(
            Instruction::new("ADDA FP, #offset", exec::adda_fp).with_group("arithmetic"),
        )?;
        let adda_fp_back = set.register(
            Instruction::new("ADDA FP, -#offset", exec::adda_fp_back).with_group("arithmetic"),
        )?;
        let suba = set.register(Instruction::new("SUBA #val", exec::suba).with_group("arithmetic"))?;
        let suba_fp = set.register(
            Instruction::new("SUBA FP, #offset", exec::suba_fp).with_group("arithmetic"),
        )?;
        let suba_fp_back = set.register(
            Instruction::new("SUBA FP, -#offset", exec::suba_fp_back).with_group("arithmetic"),
        )?;

        let addsp = set.register(Instruction::new("ADDSP #val", exec::addsp).with_group("stack"))?;
        let subsp = set.register(Instruction::new("SUBSP #val", exec::subsp).with_group("stack"))?;
        let pusha = set.register(Instruction::new("PUSHA", exec::pusha).with_group("stack"))?;
        let popa = set.register(Instruction::new("POPA", exec::popa).with_group("stack"))?;

        let call = set.register(Instruction::new("CALL #addr", exec::call).with_group("flow"))?;
        let ret = set.register(Instruction::new("RET", exec::ret).with_group("flow"))?;
        let retfs = set.register(Instruction::new("RETFS #size", exec::retfs).with_group("flow"))?;
        let jmp = set.register(Instruction::new("JMP #addr", exec::jmp).with_group("flow"))?;
        let tsta = set.register(Instruction::new("TSTA", exec::tsta).with_group("flow"))?;
        let jmpz = set.register(Instruction::new("JMPZ #addr", exec::jmpz).with_group("flow"))?;

        Ok(Self {
            set,
            invalid,
            exit,
            out,
            lda,
            ldfp,
            ldsp,
            ldfp_sp,
            lda_fp,
            lda_fp_back,
            sta_fp,
            sta_fp_back,
            adda,
            adda_fp,
            adda_fp_back,
            suba,
            suba_fp,
            suba_fp_back,
            addsp,
            subsp,
            pusha,
            popa,
            call,
            ret,
            retfs,
            jmp,
            tsta,
            jmpz,
        })
    }
}

impl Default for Isa {
    fn default() -> Self {
        // A fixed table with one pinned id cannot collide.
        Self::try_new().expect("default instruction table registers cleanly")
    }
}

/// Behaviors, one per instruction.
mod exec {
    use bytec_asm::ExecuteState::{Halt, Proceed};
    use bytec_asm::{ExecuteState, Fault, Word};

    use crate::emulator::Emulator;

    fn frame_byte(value: usize) -> Result<u8, Fault> {
        u8::try_from(value).map_err(|_| Fault::MemoryOverflow { address: value })
    }

    pub(super) fn invalid(_: &mut Emulator) -> Result<ExecuteState, Fault> {
        Err(Fault::InvalidOpcode { opcode: 0 })
    }

    pub(super) fn exit(_: &mut Emulator) -> Result<ExecuteState, Fault> {
        Ok(Halt)
    }

    pub(super) fn out(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.a_lower();
        vm.write_output(value);
        Ok(Proceed)
    }

    pub(super) fn lda(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        vm.set_a(Word::from(value));
        Ok(Proceed)
    }

    pub(super) fn ldfp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        vm.set_fp(usize::from(value));
        Ok(Proceed)
    }

    pub(super) fn ldsp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        vm.set_sp(usize::from(value));
        Ok(Proceed)
    }

    pub(super) fn ldfp_sp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        vm.set_fp(vm.sp());
        Ok(Proceed)
    }

    pub(super) fn lda_fp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let value = vm.read_byte(vm.frame_address(offset))?;
        vm.set_a(Word::from(value));
        Ok(Proceed)
    }

    pub(super) fn lda_fp_back(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let address = vm.frame_address_back(offset)?;
        let value = vm.read_byte(address)?;
        vm.set_a(Word::from(value));
        Ok(Proceed)
    }

    pub(super) fn sta_fp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let address = vm.frame_address(offset);
        let value = vm.a_lower();
        vm.write_byte(address, value)?;
        Ok(Proceed)
    }

    pub(super) fn sta_fp_back(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let address = vm.frame_address_back(offset)?;
        let value = vm.a_lower();
        vm.write_byte(address, value)?;
        Ok(Proceed)
    }

    pub(super) fn adda(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        vm.set_a(vm.a().wrapping_add(Word::from(value)));
        Ok(Proceed)
    }

    pub(super) fn adda_fp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let value = vm.read_byte(vm.frame_address(offset))?;
        vm.set_a(vm.a().wrapping_add(Word::from(value)));
        Ok(Proceed)
    }

    pub(super) fn adda_fp_back(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let address = vm.frame_address_back(offset)?;
        let value = vm.read_byte(address)?;
        vm.set_a(vm.a().wrapping_add(Word::from(value)));
        Ok(Proceed)
    }

    pub(super) fn suba(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        vm.set_a(vm.a().wrapping_sub(Word::from(value)));
        Ok(Proceed)
    }

    pub(super) fn suba_fp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let value = vm.read_byte(vm.frame_address(offset))?;
        vm.set_a(vm.a().wrapping_sub(Word::from(value)));
        Ok(Proceed)
    }

    pub(super) fn suba_fp_back(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let offset = vm.fetch()?;
        let address = vm.frame_address_back(offset)?;
        let value = vm.read_byte(address)?;
        vm.set_a(vm.a().wrapping_sub(Word::from(value)));
        Ok(Proceed)
    }

    pub(super) fn addsp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        vm.set_sp(vm.sp() + usize::from(value));
        Ok(Proceed)
    }

    pub(super) fn subsp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.fetch()?;
        let sp = vm
            .sp()
            .checked_sub(usize::from(value))
            .ok_or(Fault::AddressUnderflow)?;
        vm.set_sp(sp);
        Ok(Proceed)
    }

    pub(super) fn pusha(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.a_lower();
        vm.push(value)?;
        Ok(Proceed)
    }

    pub(super) fn popa(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let value = vm.pop()?;
        vm.set_a(Word::from(value));
        Ok(Proceed)
    }

    pub(super) fn call(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let target = vm.fetch()?;
        let fp = frame_byte(vm.fp())?;
        let pc = frame_byte(vm.pc())?;

        vm.push(fp)?;
        vm.push(pc)?;
        vm.set_fp(vm.sp());
        vm.set_pc(usize::from(target));
        Ok(Proceed)
    }

    pub(super) fn ret(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        vm.set_sp(vm.fp());
        unwind(vm)
    }

    pub(super) fn retfs(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let frame_size = vm.fetch()?;
        vm.set_sp(vm.fp() + usize::from(frame_size));
        unwind(vm)
    }

    // Shared tail of the return instructions: SP already points at
    // the saved PC.
    fn unwind(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let pc = vm.pop()?;
        let fp = vm.pop()?;
        vm.set_pc(usize::from(pc));
        vm.set_fp(usize::from(fp));
        Ok(Proceed)
    }

    pub(super) fn jmp(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let target = vm.fetch()?;
        vm.set_pc(usize::from(target));
        Ok(Proceed)
    }

    pub(super) fn tsta(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        vm.set_zero_flag(vm.a() == 0);
        Ok(Proceed)
    }

    pub(super) fn jmpz(vm: &mut Emulator) -> Result<ExecuteState, Fault> {
        let target = vm.fetch()?;
        if vm.zero_flag() {
            vm.set_pc(usize::from(target));
        }
        Ok(Proceed)
    }
}
