//! The naive register allocator: the correctness baseline and default.
//!
//! Every variable gets exactly one frame-relative slot, discovered on first
//! touch; every use loads into fixed scratch and every definition writes
//! through scratch with a store appended. No liveness or use-count
//! information is consulted. The selector's generic call save/restore
//! groups are deleted because the slots already hold every value, and the
//! whole frame is popped before each return jump.

use alloc::{
    collections::{BTreeMap, BTreeSet},
    string::{String, ToString},
    vec::Vec,
};

use mips32_asm::{addi, Instruction, Reg};

use crate::frame::{FrameMaps, OffsetMap};

use super::{call_shapes, is_return_jump, rewrite_instruction, RegisterAllocator};

/// One slot per variable, fixed scratch for every use.
pub struct NaiveAllocator {
    frames: FrameMaps,
    current: Option<String>,
}

impl NaiveAllocator {
    /// Create a naive allocator over the selector's per-function offset
    /// maps.
    pub fn new(frames: FrameMaps) -> Self {
        Self {
            frames,
            current: None,
        }
    }

    fn current_map(&self) -> &OffsetMap {
        let name = self
            .current
            .as_ref()
            .expect("allocation outside any function");
        self.frames.get(name).expect("function has no offset map")
    }

    fn current_map_mut(&mut self) -> &mut OffsetMap {
        let name = self
            .current
            .as_ref()
            .expect("allocation outside any function");
        self.frames
            .get_mut(name)
            .expect("function has no offset map")
    }
}

impl RegisterAllocator for NaiveAllocator {
    fn allocate(&mut self, instructions: Vec<Instruction>) -> Vec<Instruction> {
        // The selector's save-all/restore-all groups are redundant here:
        // every variable already lives in its slot.
        let mut skip: BTreeSet<usize> = BTreeSet::new();
        for shape in call_shapes(&instructions).values() {
            skip.extend(shape.save.clone());
            skip.extend(shape.restore.clone());
        }

        let register_map: BTreeMap<String, Reg> = BTreeMap::new();
        let mut out = Vec::new();
        for (i, inst) in instructions.iter().enumerate() {
            if skip.contains(&i) {
                continue;
            }
            if let Some(name) = inst.label_name() {
                if self.frames.contains_function(name) {
                    self.current = Some(name.to_string());
                }
                out.push(inst.clone());
                continue;
            }
            if self.current.is_none() {
                // Stream prelude (section marker, entry branch).
                out.push(inst.clone());
                continue;
            }
            if is_return_jump(inst) {
                let slots = self.current_map().len() as i32;
                out.push(addi(Reg::SP, Reg::SP, 4 * slots));
            }
            rewrite_instruction(inst, self.current_map_mut(), &register_map, &mut out);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use alloc::{format, vec::Vec};

    use tiger_ir::parse_program;

    use super::super::RegisterAllocator;
    use super::*;
    use crate::lower::lower_program;

    fn allocate(src: &str) -> Vec<String> {
        let program = parse_program(src).expect("Failed to parse IR program");
        let lowering = lower_program(&program);
        let mut allocator = NaiveAllocator::new(lowering.frames);
        allocator
            .allocate(lowering.instructions)
            .iter()
            .map(|i| format!("{}", i))
            .collect()
    }

    #[test]
    fn test_no_virtual_registers_survive() {
        let lines = allocate(
            r#"
#start_function
int add2(int a, int b):
int-list: t
    add, t, a, b
    return, t
#end_function

#start_function
void main():
int-list: x
    callr, x, add2, 3, 4
    call, puti, x
#end_function
"#,
        );
        for line in &lines {
            assert!(!line.contains("$a,"), "virtual register in: {}", line);
            assert!(!line.contains("$t,"), "virtual register in: {}", line);
            assert!(!line.contains("$x"), "virtual register in: {}", line);
        }
    }

    #[test]
    fn test_definition_writes_through_scratch() {
        let lines = allocate(
            r#"
#start_function
void main():
int-list: x
    assign, x, 3
#end_function
"#,
        );
        // assign lowers to li; naive rewrites the dest through $t8 and
        // stores it to the variable's slot.
        let pos = lines.iter().position(|l| l == "li $t8, 3").unwrap();
        assert_eq!(lines[pos + 1], "sw $t8, 0($sp)");
    }

    #[test]
    fn test_uses_load_into_scratch_pair() {
        let lines = allocate(
            r#"
#start_function
void main():
int-list: x, y, z
    add, z, x, y
#end_function
"#,
        );
        let pos = lines.iter().position(|l| l.starts_with("add ")).unwrap();
        assert_eq!(lines[pos], "add $t8, $t8, $t9");
        assert!(lines[pos - 1].starts_with("lw $t9, "));
        assert!(lines[pos - 2].starts_with("lw $t8, "));
        assert_eq!(lines[pos + 1], "sw $t8, 0($sp)");
    }

    #[test]
    fn test_call_save_restore_elided() {
        let lines = allocate(
            r#"
#start_function
int add2(int a, int b):
int-list: t
    add, t, a, b
    return, t
#end_function

#start_function
void main():
int-list: x
    callr, x, add2, 3, 4
#end_function
"#,
        );
        let jal_pos = lines.iter().position(|l| l == "jal add2").unwrap();
        // The generic save group is gone: the call is directly preceded by
        // the return-address save.
        assert_eq!(lines[jal_pos - 1], "sw $ra, 0($sp)");
        assert_eq!(lines[jal_pos - 2], "addi $sp, $sp, -4");
        assert!(!lines[jal_pos - 3].starts_with("sw"));
        // And the restore group is gone too: ra restore, then the result
        // capture through scratch.
        assert_eq!(lines[jal_pos + 1], "lw $ra, 0($sp)");
        assert_eq!(lines[jal_pos + 2], "addi $sp, $sp, 4");
        assert_eq!(lines[jal_pos + 3], "move $t8, $v0");
    }

    #[test]
    fn test_frame_popped_before_return_jump() {
        let lines = allocate(
            r#"
#start_function
int three(int a, int b, int c):
int-list:
    return, c
#end_function

#start_function
void main():
int-list:
    call, three, 1, 2, 3
#end_function
"#,
        );
        let jr_pos = lines.iter().position(|l| l == "jr $ra").unwrap();
        // three slots (a, b, c): 12 bytes popped.
        assert_eq!(lines[jr_pos - 1], "addi $sp, $sp, 12");
    }
}
