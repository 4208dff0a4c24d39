//! MIPS emitter (C10): a single pass over the quadruple stream with a fixed
//! dispatch table, translating to MIPS32 assembly a MARS-class simulator
//! can load directly (§4.9, §6).
//!
//! Scope follows §4.5's "minimum viability" line: arithmetic, logical,
//! relational, data movement, control flow, functions, and `PRINT`/`READ`.
//! Arrays, objects, and exceptions are part of the quadruple model (§4.5)
//! but never reach MIPS — `BEGIN_CLASS`/`CALL_METHOD`/`ARRAY_*`/etc. lower
//! to a passthrough comment instead of instructions, the same way string
//! concatenation's `+` is checked but never lowered (§9).

use std::collections::{HashMap, HashSet};

use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::ir::{Quad, QuadList};
use crate::scope::ScopeStack;

use super::register::RegisterAllocator;

/// Accumulated `.data`/`.text` output plus the bookkeeping a single forward
/// pass over the quadruple stream needs: which function (if any) is
/// currently open, its epilogue label, and the index of the stack-reserve
/// instruction to backpatch once the function's spill usage is known.
pub struct MipsEmitter<'a> {
    config: &'a CompilerConfig,
    data: Vec<String>,
    text: Vec<String>,
    string_labels: HashMap<String, String>,
    next_str_id: u32,
    next_ephemeral: u32,
    global_offsets: HashMap<i32, String>,
    /// Every declared global's name, checked by `store_result` so a write
    /// to a global (whether at top level or from inside a function) lands
    /// in its `.data` slot instead of an ephemeral register binding — the
    /// only way a global's value, once written anywhere but the initial
    /// `.data` seed, ever becomes visible to a later `LOAD GP` of the same
    /// name.
    global_names: HashSet<String>,
    current: Option<FunctionContext>,
    /// Register pool for quadruples outside any function/method — lazily
    /// opened by [`Self::allocator`] on first use, since most programs
    /// never touch it (§8 scenario 2 does: top-level arithmetic needs
    /// somewhere to put its operands).
    module: Option<ModuleContext>,
}

/// State open for the duration of one `BEGIN_FUNC`/`END_FUNC` (or
/// `BEGIN_METHOD`/`END_METHOD`, though methods never reach this emitter
/// today — see the module doc) pair.
struct FunctionContext {
    epilogue_label: String,
    allocator: RegisterAllocator,
    local_frame_size: i32,
    /// Index into `text` of the `addi $sp, $sp, -N` prologue line whose `N`
    /// is only known once the body has been fully processed and the
    /// allocator's final spill usage is available — the emitter's own
    /// version of quadruple backpatching (§3, §6).
    reserve_line: usize,
    /// How many `PARAM` quads have been seen since the last `CALL`/reset.
    param_index: usize,
    /// How many extra (5th and beyond) parameters were pushed on the stack
    /// for the call currently being assembled, so the post-`jal` cleanup
    /// pops exactly that much.
    extra_params_pushed: usize,
}

/// State for the top-level instruction stream, opened once on first use and
/// never popped — nothing ever jumps back out of module scope the way
/// `RETURN` jumps out of a function, so there is no matching "end" quad to
/// close it at. `$fp` is pinned here purely so spills/restores (which
/// address relative to `$fp`, see `register.rs`) have somewhere valid to
/// point at; the reserved bytes sit below whatever the first function call
/// pushes on top and are never reclaimed.
struct ModuleContext {
    allocator: RegisterAllocator,
    reserve_line: usize,
}

impl<'a> MipsEmitter<'a> {
    /// Translate `quads` to a complete MIPS32 assembly listing. `scopes` is
    /// the analyzer's output, consulted for global variable offsets and
    /// function/method frame sizes (§3's activation record, known only
    /// after semantic analysis assigned every offset).
    pub fn emit(quads: &QuadList, scopes: &ScopeStack, config: &'a CompilerConfig) -> CompileResult<String> {
        let mut emitter = MipsEmitter {
            config,
            data: Vec::new(),
            text: Vec::new(),
            string_labels: HashMap::new(),
            next_str_id: 0,
            next_ephemeral: 0,
            global_offsets: scopes
                .global_variables()
                .map(|v| (v.offset, v.name.clone()))
                .collect(),
            global_names: scopes.global_variables().map(|v| v.name.clone()).collect(),
            current: None,
            module: None,
        };
        emitter.seed_globals(quads, scopes);

        for quad in quads.iter() {
            emitter.emit_quad(quad, scopes)?;
        }

        if let Some(module) = emitter.module.take() {
            let spilled = module.allocator.spill_bytes_used();
            emitter.text[module.reserve_line] = format!("    addi $sp, $sp, -{spilled}");
        }

        if emitter.current.is_none() {
            emitter.text.push("    li $v0, 10".to_string());
            emitter.text.push("    syscall".to_string());
        }

        Ok(emitter.render())
    }

    // ---- .data seeding ---------------------------------------------------

    /// Every global variable gets a `.word` slot, initialized from the
    /// literal value of its top-level `ASSIGN` quad if one precedes the
    /// first function/class boundary, else `0` — §8 scenario 1's
    /// `x: .word 1`. A non-literal top-level initializer (e.g. `let c = a +
    /// b`) is left at `0` here; `lower_assign` emits the real instructions
    /// that compute and store it at runtime.
    fn seed_globals(&mut self, quads: &QuadList, scopes: &ScopeStack) {
        let mut initial: HashMap<String, i64> = HashMap::new();
        for quad in quads.iter() {
            if matches!(quad.op_text.as_str(), "BEGIN_FUNC" | "BEGIN_METHOD" | "BEGIN_CLASS") {
                break;
            }
            if quad.op_text == "ASSIGN" {
                if let (Some(arg1), Some(result)) = (&quad.arg1, &quad.result) {
                    if let Some(value) = parse_numeric_literal(arg1) {
                        initial.insert(result.clone(), value);
                    }
                }
            }
        }

        for var in scopes.global_variables() {
            let value = initial.get(&var.name).copied().unwrap_or(0);
            self.data.push(format!("{}: .word {}", var.name, value));
        }
    }

    fn intern_string(&mut self, text: &str) -> String {
        if let Some(label) = self.string_labels.get(text) {
            return label.clone();
        }
        let label = format!("str_{}", self.next_str_id);
        self.next_str_id += 1;
        self.data.push(format!("{label}: .asciiz \"{text}\""));
        self.string_labels.insert(text.to_string(), label.clone());
        label
    }

    fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(".data\n");
        out.push_str("newline: .asciiz \"\\n\"\n");
        for line in &self.data {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(".text\n");
        out.push_str(".globl main\n");
        for line in &self.text {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    // ---- dispatch ----------------------------------------------------------

    fn emit_quad(&mut self, quad: &Quad, scopes: &ScopeStack) -> CompileResult<()> {
        if self.config.emit_quad_comments {
            self.text.push(format!("    # {quad}"));
        }

        match quad.op_text.as_str() {
            "ASSIGN" => self.lower_assign(quad)?,
            "ADD" => self.lower_binary_arith(quad, "add")?,
            "SUB" => self.lower_binary_arith(quad, "sub")?,
            "MUL" => self.lower_binary_arith(quad, "mul")?,
            "DIV" => self.lower_div(quad)?,
            "MOD" => self.lower_mod(quad)?,
            "NEG" => self.lower_unary(quad, "neg")?,
            "NOT" => self.lower_not(quad)?,
            "AND" => self.lower_logical(quad, "and")?,
            "OR" => self.lower_logical(quad, "or")?,
            "EQ" => self.lower_eq_ne(quad, "seq")?,
            "NE" => self.lower_eq_ne(quad, "sne")?,
            "LT" => self.lower_compare(quad, false, false)?,
            "GT" => self.lower_compare(quad, true, false)?,
            "LE" => self.lower_compare(quad, true, true)?,
            "GE" => self.lower_compare(quad, false, true)?,
            "LABEL" => self.lower_label(quad),
            "GOTO" => self.lower_goto(quad),
            "IF_TRUE" => self.lower_branch(quad, "bnez")?,
            "IF_FALSE" => self.lower_branch(quad, "beqz")?,
            "LOAD" => self.lower_load(quad)?,
            "STORE" => self.lower_store(quad)?,
            "BEGIN_FUNC" => self.lower_begin_func(quad, scopes, None),
            "BEGIN_METHOD" => self.lower_begin_func(quad, scopes, Some(())),
            "END_FUNC" | "END_METHOD" => self.lower_end_func(quad),
            "PARAM" => self.lower_param(quad)?,
            "CALL" => self.lower_call(quad)?,
            "RETURN" => self.lower_return(quad)?,
            "PRINT" => self.lower_print(quad)?,
            "READ" => self.lower_read(quad)?,
            _ => {
                self.text.push(format!("    # unsupported in this backend: {quad}"));
            }
        }
        Ok(())
    }

    /// The register pool for whichever instruction stream is currently
    /// being lowered: a function/method's own allocator if one is open,
    /// else the top-level stream's — opened lazily on first use, since a
    /// program with no top-level arithmetic never needs one.
    fn allocator(&mut self) -> &mut RegisterAllocator {
        if self.current.is_none() && self.module.is_none() {
            self.text.push("    move $fp, $sp".to_string());
            let reserve_line = self.text.len();
            self.text.push("    addi $sp, $sp, 0".to_string());
            self.module = Some(ModuleContext {
                allocator: RegisterAllocator::new(self.config, 0),
                reserve_line,
            });
        }
        match self.current.as_mut() {
            Some(ctx) => &mut ctx.allocator,
            None => &mut self.module.as_mut().expect("opened above").allocator,
        }
    }

    /// Resolve an operand to a register: a literal is loaded via `li` into
    /// an ephemeral key the allocator treats like any other binding; a
    /// string literal is loaded via `la`; a name or temporary goes through
    /// the allocator's own resident/spill path.
    fn load_operand(&mut self, operand: &str) -> CompileResult<String> {
        if let Some(value) = parse_numeric_literal(operand) {
            let key = format!("__lit{}", self.next_ephemeral);
            self.next_ephemeral += 1;
            let access = self.allocator().access(&key, true)?;
            self.text.extend(access.lines);
            self.text.push(format!("    li {}, {}", access.register, value));
            self.allocator().mark_dead(&key);
            return Ok(access.register);
        }
        if operand == "null" {
            return self.load_operand("0");
        }
        if operand.starts_with('"') {
            let label = self.intern_string(operand.trim_matches('"'));
            let key = format!("__lit{}", self.next_ephemeral);
            self.next_ephemeral += 1;
            let access = self.allocator().access(&key, true)?;
            self.text.extend(access.lines);
            self.text.push(format!("    la {}, {}", access.register, label));
            self.allocator().mark_dead(&key);
            return Ok(access.register);
        }

        let access = self.allocator().access(operand, false)?;
        self.text.extend(access.lines);
        Ok(access.register)
    }

    /// Bind `src_reg`'s value to `dest`. A global variable's value only
    /// ever persists in its `.data` slot, so a write to one goes straight
    /// there via `sw`; anything else (an IR temporary, a function-local
    /// name already addressed through `STORE`) goes through the allocator's
    /// resident/spill bookkeeping like any other binding.
    fn store_result(&mut self, dest: &str, src_reg: &str) -> CompileResult<()> {
        if self.global_names.contains(dest) {
            self.text.push(format!("    sw {src_reg}, {dest}"));
            return Ok(());
        }
        let access = self.allocator().access(dest, true)?;
        self.text.extend(access.lines);
        if access.register != src_reg {
            self.text.push(format!("    move {}, {}", access.register, src_reg));
        }
        Ok(())
    }

    // ---- data movement -----------------------------------------------------

    fn lower_assign(&mut self, quad: &Quad) -> CompileResult<()> {
        let value = quad.arg1.as_deref().unwrap_or("0");
        let result = quad.result.as_deref().unwrap_or("");
        if self.global_names.contains(result) && parse_numeric_literal(value).is_some() {
            // A literal global initializer is already folded into `.data`
            // by `seed_globals`; nothing left to emit.
            return Ok(());
        }
        let reg = self.load_operand(value)?;
        self.store_result(result, &reg)
    }

    fn lower_load(&mut self, quad: &Quad) -> CompileResult<()> {
        let base = quad.arg1.as_deref().unwrap_or("FP");
        let offset = quad.arg2.as_deref().unwrap_or("0");
        let dest = quad.result.as_deref().unwrap_or("");
        let access = self.allocator().access(dest, true)?;
        self.text.extend(access.lines);
        match base {
            "FP" => self.text.push(format!("    lw {}, {}($fp)", access.register, offset)),
            "GP" => {
                let off: i32 = offset.parse().unwrap_or(0);
                let name = self.global_offsets.get(&off).cloned().unwrap_or_else(|| offset.to_string());
                self.text.push(format!("    lw {}, {}", access.register, name));
            }
            other => self.text.push(format!("    # unknown LOAD base '{other}'")),
        }
        Ok(())
    }

    fn lower_store(&mut self, quad: &Quad) -> CompileResult<()> {
        let value = quad.arg1.as_deref().unwrap_or("0");
        let base = quad.arg2.as_deref().unwrap_or("FP");
        let offset = quad.result.as_deref().unwrap_or("0");
        let reg = self.load_operand(value)?;
        match base {
            "FP" => self.text.push(format!("    sw {reg}, {offset}($fp)")),
            "GP" => {
                let off: i32 = offset.parse().unwrap_or(0);
                let name = self.global_offsets.get(&off).cloned().unwrap_or_else(|| offset.to_string());
                self.text.push(format!("    sw {reg}, {name}"));
            }
            other => self.text.push(format!("    # unknown STORE base '{other}'")),
        }
        Ok(())
    }

    // ---- arithmetic / logical / relational ---------------------------------

    fn lower_binary_arith(&mut self, quad: &Quad, mnemonic: &str) -> CompileResult<()> {
        let (s1, s2, dest) = self.binary_operands(quad)?;
        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text.push(format!("    {mnemonic} {}, {}, {}", access.register, s1, s2));
        Ok(())
    }

    fn lower_div(&mut self, quad: &Quad) -> CompileResult<()> {
        self.lower_binary_arith(quad, "div")
    }

    fn lower_mod(&mut self, quad: &Quad) -> CompileResult<()> {
        let (s1, s2, dest) = self.binary_operands(quad)?;
        self.text.push(format!("    div {s1}, {s2}"));
        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text.push(format!("    mfhi {}", access.register));
        Ok(())
    }

    fn lower_unary(&mut self, quad: &Quad, mnemonic: &str) -> CompileResult<()> {
        let operand = quad.arg1.as_deref().unwrap_or("0");
        let dest = quad.result.clone().unwrap_or_default();
        let s = self.load_operand(operand)?;
        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text.push(format!("    {mnemonic} {}, {}", access.register, s));
        Ok(())
    }

    /// `NOT a -> r`: booleanize via `seq r, a, $zero` (§4.9).
    fn lower_not(&mut self, quad: &Quad) -> CompileResult<()> {
        let operand = quad.arg1.as_deref().unwrap_or("0");
        let dest = quad.result.clone().unwrap_or_default();
        let s = self.load_operand(operand)?;
        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text.push(format!("    seq {}, {}, $zero", access.register, s));
        Ok(())
    }

    /// `AND`/`OR`: booleanize both operands with `sne ..., $zero` before the
    /// bitwise op, so a pair of non-zero-but-unequal truthy values (e.g.
    /// `2 && 3`) still yields a clean `0`/`1` (§4.9).
    fn lower_logical(&mut self, quad: &Quad, mnemonic: &str) -> CompileResult<()> {
        let (s1, s2, dest) = self.binary_operands(quad)?;

        let key1 = format!("__bool{}", self.next_ephemeral);
        self.next_ephemeral += 1;
        let b1 = self.allocator().access(&key1, true)?;
        self.text.extend(b1.lines);
        self.text.push(format!("    sne {}, {}, $zero", b1.register, s1));

        let key2 = format!("__bool{}", self.next_ephemeral);
        self.next_ephemeral += 1;
        let b2 = self.allocator().access(&key2, true)?;
        self.text.extend(b2.lines);
        self.text.push(format!("    sne {}, {}, $zero", b2.register, s2));

        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text
            .push(format!("    {mnemonic} {}, {}, {}", access.register, b1.register, b2.register));
        Ok(())
    }

    /// `EQ`/`NE`: `sub dst, s1, s2; seq/sne dst, dst, $zero` (§4.9).
    fn lower_eq_ne(&mut self, quad: &Quad, mnemonic: &str) -> CompileResult<()> {
        let (s1, s2, dest) = self.binary_operands(quad)?;
        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text.push(format!("    sub {}, {}, {}", access.register, s1, s2));
        self.text
            .push(format!("    {mnemonic} {}, {}, $zero", access.register, access.register));
        Ok(())
    }

    /// `LT`: `slt dst, s1, s2`. `GT` is the mirror image (`slt dst, s2,
    /// s1`). `LE`/`GE` are the logical complement of the opposite strict
    /// comparison, via `xori ..., 1` (§4.9's "derived via `slt` + `xori`").
    fn lower_compare(&mut self, quad: &Quad, swap: bool, negate: bool) -> CompileResult<()> {
        let (s1, s2, dest) = self.binary_operands(quad)?;
        let (lhs, rhs) = if swap { (s2, s1) } else { (s1, s2) };
        let access = self.allocator().access(&dest, true)?;
        self.text.extend(access.lines);
        self.text.push(format!("    slt {}, {}, {}", access.register, lhs, rhs));
        if negate {
            self.text.push(format!("    xori {}, {}, 1", access.register, access.register));
        }
        Ok(())
    }

    fn binary_operands(&mut self, quad: &Quad) -> CompileResult<(String, String, String)> {
        let a1 = quad.arg1.as_deref().unwrap_or("0").to_string();
        let a2 = quad.arg2.as_deref().unwrap_or("0").to_string();
        let dest = quad.result.clone().unwrap_or_default();
        let s1 = self.load_operand(&a1)?;
        let s2 = self.load_operand(&a2)?;
        Ok((s1, s2, dest))
    }

    // ---- control flow --------------------------------------------------

    fn lower_label(&mut self, quad: &Quad) {
        let name = quad.result.as_deref().unwrap_or("L?");
        self.text.push(format!("{}:", sanitize_label(name)));
    }

    fn lower_goto(&mut self, quad: &Quad) {
        let target = quad.result.as_deref().unwrap_or("L?");
        self.text.push(format!("    j {}", sanitize_label(target)));
    }

    fn lower_branch(&mut self, quad: &Quad, mnemonic: &str) -> CompileResult<()> {
        let cond = quad.arg1.as_deref().unwrap_or("0");
        let target = quad.result.as_deref().unwrap_or("L?");
        let reg = self.load_operand(cond)?;
        self.text.push(format!("    {mnemonic} {}, {}", reg, sanitize_label(target)));
        Ok(())
    }

    // ---- functions ----------------------------------------------------

    fn lower_begin_func(&mut self, quad: &Quad, scopes: &ScopeStack, is_method: Option<()>) {
        let name = quad.arg1.clone().unwrap_or_default();
        let label = sanitize_label(&name);

        let (param_frame_size, local_frame_size, num_params) = if is_method.is_some() {
            let (class, method) = name.split_once('.').unwrap_or((name.as_str(), ""));
            match scopes.classes.lookup_method(class, method) {
                Some(f) => (f.param_frame_size as i32, f.local_frame_size as i32, f.params.len()),
                None => (0, 0, 0),
            }
        } else {
            match scopes.resolve_global(&name).and_then(crate::symbol::Symbol::as_function) {
                Some(f) => (f.param_frame_size as i32, f.local_frame_size as i32, f.params.len()),
                None => (0, 0, 0),
            }
        };

        self.text.push(format!("{label}:"));
        self.text.push("    addi $sp, $sp, -8".to_string());
        self.text.push("    sw $ra, 4($sp)".to_string());
        self.text.push("    sw $fp, 0($sp)".to_string());
        self.text.push("    move $fp, $sp".to_string());
        let reserve_line = self.text.len();
        self.text.push("    addi $sp, $sp, 0".to_string());

        for i in 0..num_params.min(4) {
            self.text.push(format!("    sw $a{i}, {}($fp)", 8 + 4 * i));
        }

        self.current = Some(FunctionContext {
            epilogue_label: format!("{label}_epilogue"),
            allocator: RegisterAllocator::new(self.config, 8 + param_frame_size + local_frame_size),
            local_frame_size,
            reserve_line,
            param_index: 0,
            extra_params_pushed: 0,
        });
    }

    fn lower_end_func(&mut self, _quad: &Quad) {
        let Some(ctx) = self.current.take() else { return };
        let spilled = ctx.allocator.spill_bytes_used();
        let total = ctx.local_frame_size + spilled;
        self.text[ctx.reserve_line] = format!("    addi $sp, $sp, -{total}");

        self.text.push(format!("{}:", ctx.epilogue_label));
        self.text.push("    move $sp, $fp".to_string());
        self.text.push("    lw $fp, 0($sp)".to_string());
        self.text.push("    lw $ra, 4($sp)".to_string());
        self.text.push("    addi $sp, $sp, 8".to_string());
        self.text.push("    jr $ra".to_string());
    }

    fn lower_param(&mut self, quad: &Quad) -> CompileResult<()> {
        let value = quad.arg1.as_deref().unwrap_or("0");
        let reg = self.load_operand(value)?;
        let Some(ctx) = self.current.as_mut() else { return Ok(()) };
        let index = ctx.param_index;
        ctx.param_index += 1;
        if index < 4 {
            self.text.push(format!("    move $a{index}, {reg}"));
        } else {
            self.current.as_mut().unwrap().extra_params_pushed += 1;
            self.text.push("    addi $sp, $sp, -4".to_string());
            self.text.push(format!("    sw {reg}, 0($sp)"));
        }
        Ok(())
    }

    fn lower_call(&mut self, quad: &Quad) -> CompileResult<()> {
        let target = quad.arg1.clone().unwrap_or_default();
        self.text.push(format!("    jal {}", sanitize_label(&target)));

        let extras = self.current.as_ref().map(|c| c.extra_params_pushed).unwrap_or(0);
        if extras > 0 {
            self.text.push(format!("    addi $sp, $sp, {}", extras * 4));
        }

        if let Some(dest) = quad.result.as_deref() {
            self.store_result(dest, "$v0")?;
        }
        if let Some(ctx) = self.current.as_mut() {
            ctx.param_index = 0;
            ctx.extra_params_pushed = 0;
        }
        Ok(())
    }

    fn lower_return(&mut self, quad: &Quad) -> CompileResult<()> {
        if let Some(value) = quad.arg1.as_deref() {
            let reg = self.load_operand(value)?;
            self.text.push(format!("    move $v0, {reg}"));
        }
        let target = self
            .current
            .as_ref()
            .map(|c| c.epilogue_label.clone())
            .unwrap_or_else(|| "main_epilogue".to_string());
        self.text.push(format!("    j {target}"));
        Ok(())
    }

    // ---- I/O ------------------------------------------------------------

    fn lower_print(&mut self, quad: &Quad) -> CompileResult<()> {
        let value = quad.arg1.as_deref().unwrap_or("");
        if let Some(text) = value.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            let label = self.intern_string(text);
            self.text.push(format!("    la $a0, {label}"));
            self.text.push("    li $v0, 4".to_string());
            self.text.push("    syscall".to_string());
        } else {
            let reg = self.load_operand(value)?;
            self.text.push(format!("    move $a0, {reg}"));
            self.text.push("    li $v0, 1".to_string());
            self.text.push("    syscall".to_string());
        }
        self.text.push("    la $a0, newline".to_string());
        self.text.push("    li $v0, 4".to_string());
        self.text.push("    syscall".to_string());
        Ok(())
    }

    /// `read_int` (syscall 5); not part of §4.9's required table but a
    /// direct, low-risk counterpart to `PRINT` for the `read()` builtin.
    fn lower_read(&mut self, quad: &Quad) -> CompileResult<()> {
        let dest = quad.result.clone().unwrap_or_default();
        self.text.push("    li $v0, 5".to_string());
        self.text.push("    syscall".to_string());
        self.store_result(&dest, "$v0")
    }
}

/// MARS labels can't contain `.`; `Class.method`-style mangled names (which
/// never reach MIPS from this generator today, but are a valid quad shape)
/// are sanitized the same way a hand-written emitter would need to.
fn sanitize_label(name: &str) -> String {
    name.replace('.', "_")
}

fn parse_numeric_literal(text: &str) -> Option<i64> {
    if let Ok(i) = text.parse::<i64>() {
        return Some(i);
    }
    text.parse::<f64>().ok().map(|f| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::Analyzer;
    use crate::diagnostics::DiagnosticSink;
    use crate::ir::generator::IrGenerator;
    use crate::parser::Parser;

    fn compile_to_mips(src: &str, config: &CompilerConfig) -> String {
        let mut sink = DiagnosticSink::new();
        let mut parser = Parser::new(src, &mut sink);
        let program = parser.parse_program();
        assert!(sink.is_empty(), "parse diagnostics: {:?}", sink.iter().collect::<Vec<_>>());
        let analysis = Analyzer::analyze(&program);
        assert!(analysis.is_clean(), "semantic diagnostics: {:?}", analysis.diagnostics.iter().collect::<Vec<_>>());
        let quads = IrGenerator::generate(&program, &analysis);
        MipsEmitter::emit(&quads, &analysis.scopes, config).unwrap()
    }

    #[test]
    fn scenario_one_global_and_print() {
        let config = CompilerConfig::new();
        let mips = compile_to_mips("const x: integer = 1; function main() { print(1); }", &config);
        assert!(mips.contains("x: .word 1"));
        assert!(mips.contains("main:"));
        assert!(mips.contains("li $a0, 1") || mips.contains("move $a0,"));
        assert!(mips.contains("li $v0, 1"));
        assert!(mips.contains("syscall"));
    }

    #[test]
    fn addition_lowers_to_add_instruction() {
        let config = CompilerConfig::new().with_quad_comments(false);
        let mips = compile_to_mips(
            "function main(): void { let a: integer = 5; let b: integer = 10; let c: integer = a + b; }",
            &config,
        );
        assert!(mips.lines().any(|l| l.trim_start().starts_with("add ")));
    }

    #[test]
    fn top_level_arithmetic_lowers_to_real_instructions() {
        let config = CompilerConfig::new().with_quad_comments(false);
        let mips = compile_to_mips("let a: integer = 5; let b: integer = 10; let c: integer = a + b;", &config);
        assert!(mips.contains("a: .word 5"));
        assert!(mips.contains("b: .word 10"));
        assert!(mips.lines().any(|l| l.trim_start().starts_with("add ")));
        assert!(mips.lines().any(|l| l.trim_start().starts_with("sw") && l.contains(", c")));
    }

    #[test]
    fn global_write_from_inside_a_function_is_visible_to_a_later_read() {
        let config = CompilerConfig::new().with_quad_comments(false);
        let mips = compile_to_mips(
            "let total: integer = 0; function bump(): void { total = total + 1; } function main(): void { bump(); print(total); }",
            &config,
        );
        assert!(mips.lines().any(|l| l.trim_start().starts_with("sw") && l.contains(", total")));
        assert!(mips.lines().any(|l| l.trim_start().starts_with("lw") && l.contains(", total")));
    }

    #[test]
    fn while_loop_has_one_jump_back_and_one_forward_branch() {
        let config = CompilerConfig::new();
        let mips = compile_to_mips(
            "function main(): void { let i: integer = 0; while (i < 10) { i = i + 1; } }",
            &config,
        );
        assert_eq!(mips.lines().filter(|l| l.trim_start().starts_with("j L")).count(), 1);
        assert!(mips.lines().any(|l| l.trim_start().starts_with("beqz")));
    }

    #[test]
    fn function_prologue_and_epilogue_are_well_formed() {
        let config = CompilerConfig::new();
        let mips = compile_to_mips("function main(): void { }", &config);
        assert!(mips.contains("addi $sp, $sp, -8"));
        assert!(mips.contains("sw $ra, 4($sp)"));
        assert!(mips.contains("sw $fp, 0($sp)"));
        assert!(mips.contains("jr $ra"));
    }

    #[test]
    fn spilling_under_a_tiny_register_pool_still_emits_valid_moves() {
        let config = CompilerConfig::new().with_temp_registers(1).with_saved_registers(0);
        let mips = compile_to_mips(
            "function main(): void { let a: integer = 1; let b: integer = 2; let c: integer = a + b; }",
            &config,
        );
        assert!(mips.contains("sw"));
        assert!(mips.contains("lw") || mips.matches("sw").count() >= 1);
    }

    #[test]
    fn unsupported_ops_emit_a_comment_not_a_panic() {
        let config = CompilerConfig::new();
        let mips = compile_to_mips(
            "class A { x: integer; } function main(): void { let a: A = new A(); }",
            &config,
        );
        assert!(mips.contains("unsupported in this backend") || !mips.contains("NEW"));
    }
}
