//! Instruction traces: the `new/use/delete/kill` text format and a seeded
//! workload generator.
//!
//! In the text format `use(k)` and `delete(k)` name the k-th `new` of the
//! file (1-based). The MMU hands out pointer ids in allocation order
//! starting at `FIRST_PTR_ID`, so ordinal k resolves to pointer id
//! `FIRST_PTR_ID + k - 1`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::*;
use crate::error::{SimError, SimResult};
use crate::instruction::{Instruction, Pid, PtrId};
use crate::process::Process;

/// A materialized workload: the global instruction order plus every
/// process with its own script.
#[derive(Debug, Clone, Default)]
pub struct SimulationData {
    pub instructions: Vec<Instruction>,
    pub processes: Vec<Process>,
}

impl SimulationData {
    pub fn from_file<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| SimError::Io(format!("failed to read trace file: {}", e)))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> SimResult<Self> {
        let mut builder = TraceBuilder::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('$') {
                continue;
            }
            builder
                .parse_line(strip_line_number(line))
                .map_err(|message| SimError::Parse { line: idx + 1, message })?;
        }

        Ok(builder.finish())
    }

    /// Render in trace notation, one instruction per line.
    pub fn to_trace(&self) -> SimResult<String> {
        let mut out = String::new();
        let mut allocations: PtrId = 0;

        for (idx, inst) in self.instructions.iter().enumerate() {
            let line = match *inst {
                Instruction::Allocate { pid, size } => {
                    allocations += 1;
                    format!("new({},{})", pid, size)
                }
                Instruction::Use { ptr, .. } => format!("use({})", ordinal(ptr, allocations, idx)?),
                Instruction::Free { ptr, .. } => {
                    format!("delete({})", ordinal(ptr, allocations, idx)?)
                }
                Instruction::Terminate { pid } => format!("kill({})", pid),
            };
            out.push_str(&line);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> SimResult<()> {
        let content = self.to_trace()?;
        fs::write(path.as_ref(), content)
            .map_err(|e| SimError::Io(format!("failed to write trace file: {}", e)))
    }

    pub fn process(&self, pid: Pid) -> Option<&Process> {
        self.processes.iter().find(|p| p.pid() == pid)
    }
}

/// Ordinal of `ptr` given how many allocations precede instruction `idx`.
fn ordinal(ptr: PtrId, allocations: PtrId, idx: usize) -> SimResult<PtrId> {
    if ptr < FIRST_PTR_ID || ptr - FIRST_PTR_ID >= allocations {
        return Err(SimError::Parse {
            line: idx + 1,
            message: format!("pointer {} is referenced before its allocation", ptr),
        });
    }
    Ok(ptr - FIRST_PTR_ID + 1)
}

/// Accumulates instructions and resolves ordinals while a trace is read.
struct TraceBuilder {
    instructions: Vec<Instruction>,
    processes: BTreeMap<Pid, Process>,
    /// ordinal - 1 -> (pointer id, allocating pid)
    allocations: Vec<(PtrId, Pid)>,
}

impl TraceBuilder {
    fn new() -> Self {
        TraceBuilder {
            instructions: Vec::new(),
            processes: BTreeMap::new(),
            allocations: Vec::new(),
        }
    }

    fn parse_line(&mut self, line: &str) -> Result<(), String> {
        let (command, args) =
            split_call(line).ok_or_else(|| format!("expected `command(args)`, got `{}`", line))?;
        let args = parse_numbers(args)?;

        let inst = match (command, args.as_slice()) {
            ("new", &[pid, size]) => Instruction::Allocate { pid: to_pid(pid)?, size: to_size(size)? },
            ("use", &[k]) => {
                let (ptr, pid) = self.resolve(k)?;
                Instruction::Use { pid, ptr }
            }
            ("delete", &[k]) => {
                let (ptr, pid) = self.resolve(k)?;
                Instruction::Free { pid, ptr }
            }
            ("kill", &[pid]) => Instruction::Terminate { pid: to_pid(pid)? },
            ("new" | "use" | "delete" | "kill", _) => {
                return Err(format!("wrong number of arguments to `{}`", command));
            }
            _ => return Err(format!("unknown command `{}`", command)),
        };
        self.push(inst).map_err(|e| e.to_string())
    }

    fn resolve(&self, k: u64) -> Result<(PtrId, Pid), String> {
        usize::try_from(k)
            .ok()
            .and_then(|k| k.checked_sub(1))
            .and_then(|idx| self.allocations.get(idx))
            .copied()
            .ok_or_else(|| format!("pointer #{} was never allocated", k))
    }

    fn push(&mut self, inst: Instruction) -> SimResult<()> {
        let pid = inst.pid();
        self.processes
            .entry(pid)
            .or_insert_with(|| Process::new(pid))
            .push_instruction(inst)?;
        if let Instruction::Allocate { pid, .. } = inst {
            let ptr = FIRST_PTR_ID + self.allocations.len() as PtrId;
            self.allocations.push((ptr, pid));
        }
        self.instructions.push(inst);
        Ok(())
    }

    fn finish(self) -> SimulationData {
        SimulationData {
            instructions: self.instructions,
            processes: self.processes.into_values().collect(),
        }
    }
}

/// Drop an annotation like `12 ` or `12. ` in front of an instruction.
fn strip_line_number(line: &str) -> &str {
    let rest = line.trim_start_matches(|c: char| c.is_ascii_digit());
    if rest.len() == line.len() {
        return line;
    }
    let rest = rest.strip_prefix('.').unwrap_or(rest);
    if rest.starts_with(char::is_whitespace) {
        rest.trim_start()
    } else {
        line
    }
}

fn split_call(line: &str) -> Option<(&str, &str)> {
    let open = line.find('(')?;
    let close = line.rfind(')')?;
    if close < open {
        return None;
    }
    Some((line[..open].trim(), &line[open + 1..close]))
}

fn parse_numbers(args: &str) -> Result<Vec<u64>, String> {
    args.split(',')
        .map(|token| {
            let token = token.trim();
            token.parse().map_err(|_| format!("invalid number `{}`", token))
        })
        .collect()
}

fn to_pid(value: u64) -> Result<Pid, String> {
    Pid::try_from(value).map_err(|_| format!("pid {} out of range", value))
}

fn to_size(value: u64) -> Result<usize, String> {
    usize::try_from(value)
        .ok()
        .filter(|&size| size <= MAX_ALLOCATION_SIZE)
        .ok_or_else(|| format!("size {} exceeds the {}-byte limit", value, MAX_ALLOCATION_SIZE))
}

// =============================================================================
// Workload generation
// =============================================================================

/// Generate `num_processes` processes and `num_operations` instructions in
/// total, one of which per process is its final kill.
///
/// Each process is scripted first, its Use and Free naming the process's
/// own allocations by local index. The global order is then built by
/// repeatedly pulling the next instruction of a randomly chosen unfinished
/// process, and local indices become pointer ids in that order.
pub fn generate(num_processes: usize, num_operations: usize, seed: u64) -> SimResult<SimulationData> {
    if num_processes == 0 {
        return Err(SimError::Config("need at least one process".to_string()));
    }
    if num_operations < num_processes {
        return Err(SimError::Config(format!(
            "{} operations cannot cover a kill for each of {} processes",
            num_operations, num_processes
        )));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut scripts: Vec<Process> = (1..=num_processes).map(|pid| Process::new(pid as Pid)).collect();
    let mut live: Vec<Vec<PtrId>> = vec![Vec::new(); num_processes];
    let mut allocated: Vec<PtrId> = vec![0; num_processes];

    for _ in 0..num_operations - num_processes {
        let p = rng.gen_range(0..num_processes);
        let pid = scripts[p].pid();
        let mut kind = rng.gen_range(0..10);
        // use/delete need something to point at
        if kind >= 4 && live[p].is_empty() {
            kind = 0;
        }
        let inst = match kind {
            0..=3 => {
                let size = (rng.gen_range(0..GEN_SIZE_STEPS) + 1) * GEN_SIZE_STEP;
                live[p].push(allocated[p]);
                allocated[p] += 1;
                Instruction::Allocate { pid, size }
            }
            4..=7 => Instruction::Use { pid, ptr: live[p][rng.gen_range(0..live[p].len())] },
            _ => {
                let idx = rng.gen_range(0..live[p].len());
                Instruction::Free { pid, ptr: live[p].remove(idx) }
            }
        };
        scripts[p].push_instruction(inst)?;
    }
    for script in &mut scripts {
        let pid = script.pid();
        script.push_instruction(Instruction::Terminate { pid })?;
    }

    let mut builder = TraceBuilder::new();
    let mut handles: Vec<Vec<PtrId>> = vec![Vec::new(); num_processes];
    let mut unfinished: Vec<usize> = (0..num_processes).collect();
    let mut next_ptr = FIRST_PTR_ID;

    while !unfinished.is_empty() {
        let k = rng.gen_range(0..unfinished.len());
        let p = unfinished[k];
        let Some(inst) = scripts[p].next_instruction() else {
            unfinished.swap_remove(k);
            continue;
        };
        if scripts[p].is_finished() {
            unfinished.swap_remove(k);
        }

        let inst = match inst {
            Instruction::Allocate { .. } => {
                handles[p].push(next_ptr);
                next_ptr += 1;
                inst
            }
            Instruction::Use { pid, ptr } => Instruction::Use { pid, ptr: handles[p][ptr as usize] },
            Instruction::Free { pid, ptr } => Instruction::Free { pid, ptr: handles[p][ptr as usize] },
            Instruction::Terminate { .. } => inst,
        };
        builder.push(inst)?;
    }

    let data = builder.finish();
    info!(
        "generated {} instructions for {} processes (seed {})",
        data.instructions.len(),
        data.processes.len(),
        seed
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANNEX: &str = "\
new(1,500)
new(1,8000)
new(2,4096)
use(1)
use(3)
use(2)
delete(1)
kill(1)
kill(2)
";

    #[test]
    fn test_parse_resolves_ordinals() {
        let data = SimulationData::parse(ANNEX).unwrap();
        assert_eq!(data.instructions.len(), 9);
        assert_eq!(data.instructions[0], Instruction::Allocate { pid: 1, size: 500 });
        assert_eq!(data.instructions[4], Instruction::Use { pid: 2, ptr: 3 });
        assert_eq!(data.instructions[6], Instruction::Free { pid: 1, ptr: 1 });
        assert_eq!(data.instructions[8], Instruction::Terminate { pid: 2 });

        assert_eq!(data.processes.len(), 2);
        assert_eq!(data.process(1).unwrap().instructions().len(), 6);
        assert_eq!(data.process(2).unwrap().instructions().len(), 3);
    }

    #[test]
    fn test_parse_skips_comments_and_line_numbers() {
        let content = "# header\n\n$use(1)$\n1 new(3,100)\n2. use(1)\n  kill(3)  \n";
        let data = SimulationData::parse(content).unwrap();
        assert_eq!(
            data.instructions,
            vec![
                Instruction::Allocate { pid: 3, size: 100 },
                Instruction::Use { pid: 3, ptr: 1 },
                Instruction::Terminate { pid: 3 },
            ]
        );
    }

    #[test]
    fn test_parse_errors_carry_line_numbers() {
        let err = SimulationData::parse("new(1,10)\nuse(2)\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 2, .. }));

        let err = SimulationData::parse("new(1,10)\nmalloc(1)\n").unwrap_err();
        assert_eq!(err, SimError::Parse { line: 2, message: "unknown command `malloc`".to_string() });

        let err = SimulationData::parse("new(1)\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 1, .. }));

        let err = SimulationData::parse("new(1,abc)\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 1, .. }));

        let err = SimulationData::parse("use(0)\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 1, .. }));
    }

    #[test]
    fn test_parse_rejects_oversized_allocation() {
        let err = SimulationData::parse("new(1,10)\nnew(1,18446744073709551615)\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 2, .. }));

        let limit = format!("new(1,{})\n", MAX_ALLOCATION_SIZE);
        let data = SimulationData::parse(&limit).unwrap();
        assert_eq!(data.instructions[0], Instruction::Allocate { pid: 1, size: MAX_ALLOCATION_SIZE });

        let over = format!("new(1,{})\n", MAX_ALLOCATION_SIZE + 1);
        assert!(matches!(SimulationData::parse(&over), Err(SimError::Parse { line: 1, .. })));
    }

    #[test]
    fn test_parse_rejects_instruction_after_kill() {
        let err = SimulationData::parse("kill(1)\nnew(1,10)\n").unwrap_err();
        assert!(matches!(err, SimError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_to_trace_uses_ordinals() {
        let data = SimulationData::parse(ANNEX).unwrap();
        assert_eq!(data.to_trace().unwrap(), ANNEX);
    }

    #[test]
    fn test_to_trace_rejects_unallocated_pointer() {
        let data = SimulationData {
            instructions: vec![Instruction::Use { pid: 1, ptr: 1 }],
            processes: Vec::new(),
        };
        assert!(data.to_trace().is_err());
    }

    #[test]
    fn test_strip_line_number() {
        assert_eq!(strip_line_number("12 new(1,2)"), "new(1,2)");
        assert_eq!(strip_line_number("3. kill(1)"), "kill(1)");
        assert_eq!(strip_line_number("kill(1)"), "kill(1)");
        assert_eq!(strip_line_number("12new(1,2)"), "12new(1,2)");
    }

    // =========================================================================
    // Generator
    // =========================================================================

    #[test]
    fn test_generate_shape() {
        let data = generate(10, 500, 7).unwrap();
        assert_eq!(data.instructions.len(), 500);
        assert_eq!(data.processes.len(), 10);

        let kills = data.instructions.iter().filter(|i| i.is_terminate()).count();
        assert_eq!(kills, 10);
        for process in &data.processes {
            assert!(process.instructions().last().unwrap().is_terminate());
        }
    }

    #[test]
    fn test_generate_is_reproducible() {
        let a = generate(5, 200, 1234).unwrap();
        let b = generate(5, 200, 1234).unwrap();
        assert_eq!(a.instructions, b.instructions);

        let c = generate(5, 200, 4321).unwrap();
        assert_ne!(a.instructions, c.instructions);
    }

    #[test]
    fn test_generated_pointers_are_valid() {
        let data = generate(8, 400, 99).unwrap();
        let mut next_ptr = FIRST_PTR_ID;
        let mut live: BTreeMap<PtrId, Pid> = BTreeMap::new();
        let mut dead: Vec<Pid> = Vec::new();

        for inst in &data.instructions {
            assert!(!dead.contains(&inst.pid()), "{} after kill", inst);
            match *inst {
                Instruction::Allocate { pid, size } => {
                    assert!(size >= GEN_SIZE_STEP && size <= GEN_SIZE_STEP * GEN_SIZE_STEPS);
                    live.insert(next_ptr, pid);
                    next_ptr += 1;
                }
                Instruction::Use { pid, ptr } => assert_eq!(live.get(&ptr), Some(&pid)),
                Instruction::Free { pid, ptr } => assert_eq!(live.remove(&ptr), Some(pid)),
                Instruction::Terminate { pid } => dead.push(pid),
            }
        }
    }

    #[test]
    fn test_generated_processes_follow_global_order() {
        let data = generate(6, 240, 17).unwrap();
        for process in &data.processes {
            let mine: Vec<Instruction> = data
                .instructions
                .iter()
                .filter(|inst| inst.pid() == process.pid())
                .copied()
                .collect();
            assert_eq!(process.instructions(), &mine[..]);
            assert_eq!(mine.iter().filter(|i| i.is_terminate()).count(), 1);
        }
    }

    #[test]
    fn test_generated_trace_round_trips_through_text() {
        let data = generate(4, 120, 5).unwrap();
        let text = data.to_trace().unwrap();
        let parsed = SimulationData::parse(&text).unwrap();
        assert_eq!(parsed.instructions, data.instructions);
    }

    #[test]
    fn test_generate_rejects_bad_sizes() {
        assert!(generate(0, 10, 1).is_err());
        assert!(generate(10, 5, 1).is_err());
        let data = generate(3, 3, 1).unwrap();
        assert!(data.instructions.iter().all(Instruction::is_terminate));
    }
}
