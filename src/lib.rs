//! Late passes of a Java decompiler: recognizing source-level loops in a structured statement tree,
//! then deciding which bytecode variable versions form one source variable, where each is declared
//! and what it is called.

extern crate alloc;

pub mod ast;
pub mod loops;
mod options;
pub mod synchronized;
#[cfg(test)]
mod testing;
pub mod vars;
pub mod worker;

pub use self::ast::{
    EdgeId, EdgeKind, ExprId, Exprent, StatEdge, StatId, StatKind, Statement, StatementGraph,
    VarType,
};
pub use self::options::DecompilerOptions;
pub use self::vars::{
    LocalVariableTable, LvtError, LvtMergeKey, LvtVariable, VarProcessor, VarVersionPair,
    VariableNamer,
};

use self::vars::{
    IdentityNamer, definitions::VarDefinitionResolver,
    merge::{MergeError, merge_copies},
};
use core::time::Duration;
use noak::error::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MethodDecompileError {
    #[error("Failed to parse method descriptor: {0}")]
    Descriptor(#[from] DecodeError),

    #[error("While reading the local variable table: {0}")]
    Lvt(#[from] LvtError),

    #[error("While merging variables: {0}")]
    Merge(#[from] MergeError),

    #[error("Panicked: {0}")]
    Panicked(String),

    #[error("Gave up after {0:?}")]
    TimedOut(Duration),

    #[error("Failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Runs every pass over one method, in order: loop recognition, monitor copy cleanup, copy
/// merging, then declaration placement and naming.
pub fn process_method(
    graph: &mut StatementGraph,
    processor: &mut VarProcessor,
    options: &DecompilerOptions,
) -> Result<(), MethodDecompileError> {
    process_method_with_namer(graph, processor, options, &mut IdentityNamer)
}

/// Like [`process_method`], letting `namer` rename variables once their types are known.
pub fn process_method_with_namer(
    graph: &mut StatementGraph,
    processor: &mut VarProcessor,
    options: &DecompilerOptions,
    namer: &mut dyn VariableNamer,
) -> Result<(), MethodDecompileError> {
    if options.enhance_loops {
        loops::enhance_loops(graph, options);
    }
    synchronized::clean_synchronized_vars(graph);
    merge_copies(graph, processor)?;
    VarDefinitionResolver::new(graph, processor).resolve(namer, options.use_debug_var_names)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{EdgeKind, FunctionKind, LoopKind};
    use crate::testing::{assign, call, function, if_head, int, int_var};

    fn variable(name: &str, slot: u32) -> LvtVariable {
        LvtVariable {
            name: name.to_owned(),
            descriptor: "I".to_owned(),
            signature: None,
            start: 0,
            end: 100,
            slot,
            is_lvtt: false,
        }
    }

    // static void m(int limit) { for (int i = 0; i < limit; i = i + 1) sink(i); }
    fn counting_method() -> (StatementGraph, StatId) {
        let mut graph = StatementGraph::new();
        let i = int_var(&mut graph, 1);
        let zero = int(&mut graph, 0);
        let init = assign(&mut graph, i, zero);
        graph.offsets_mut(init).insert(2);
        let before = graph.basic_block(vec![init]);

        let i = int_var(&mut graph, 1);
        let limit = int_var(&mut graph, 0);
        let exit = function(&mut graph, FunctionKind::Ge, vec![i, limit]);
        graph.offsets_mut(exit).insert(5);
        let head_block = graph.basic_block(Vec::new());
        let head = if_head(&mut graph, exit);
        let guard = graph.if_statement(head_block, head, None, None);

        let i = int_var(&mut graph, 1);
        let sink = call(&mut graph, None, "Sink", "sink", "(I)V", vec![i]);
        graph.offsets_mut(sink).insert(9);
        let i_left = int_var(&mut graph, 1);
        let i_right = int_var(&mut graph, 1);
        let one = int(&mut graph, 1);
        let sum = function(&mut graph, FunctionKind::Add, vec![i_right, one]);
        let step = assign(&mut graph, i_left, sum);
        graph.offsets_mut(step).insert(14);
        let work = graph.basic_block(vec![sink, step]);

        let body = graph.sequence(vec![guard, work]);
        let stat = graph.do_loop(body);
        let after = graph.basic_block(Vec::new());
        let seq = graph.sequence(vec![before, stat, after]);
        graph.set_root_body(seq);

        graph.add_edge(EdgeKind::Regular, before, stat, None);
        graph.add_edge(EdgeKind::Break, head_block, after, Some(stat));
        graph.add_edge(EdgeKind::Regular, guard, work, None);
        graph.add_edge(EdgeKind::Continue, work, stat, Some(stat));
        graph.add_edge(EdgeKind::Regular, stat, after, None);
        (graph, stat)
    }

    #[test]
    fn counting_loop_end_to_end() {
        let (mut graph, stat) = counting_method();
        let mut processor = VarProcessor::new(b"(I)V", None).expect("valid descriptor");
        let mut table = LocalVariableTable::new();
        table.add_variable(variable("limit", 0));
        table.add_variable(variable("i", 1));
        processor.set_lvt(table);

        process_method(&mut graph, &mut processor, &DecompilerOptions::default())
            .expect("method processes");

        let do_stat = graph[stat].as_loop().expect("loop");
        assert_eq!(do_stat.loop_kind, LoopKind::For);
        let init = do_stat.init.expect("init");
        let Exprent::Assignment { left, .. } = graph[init] else {
            panic!("init is not an assignment");
        };
        let var = graph[left].as_var().expect("variable");
        assert!(var.is_definition);
        assert_eq!(var.lvt.as_ref().map(|lvt| lvt.name.as_str()), Some("i"));
        assert_eq!(processor.name(VarVersionPair::new(1, 0)), Some("i"));
        assert_eq!(processor.name(VarVersionPair::new(0, 0)), Some("limit"));
    }

    #[test]
    fn loops_can_be_left_alone() {
        let (mut graph, stat) = counting_method();
        let mut processor = VarProcessor::new(b"(I)V", None).expect("valid descriptor");
        let options = DecompilerOptions {
            enhance_loops: false,
            use_debug_var_names: false,
            ..DecompilerOptions::default()
        };
        process_method(&mut graph, &mut processor, &options).expect("method processes");
        assert_eq!(
            graph[stat].as_loop().map(|do_stat| do_stat.loop_kind),
            Some(LoopKind::Do)
        );
        assert_eq!(processor.name(VarVersionPair::new(1, 0)), Some("var1"));
    }
}
