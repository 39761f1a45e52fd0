use super::{ExprId, StatId, StatKind, StatementGraph};
use core::fmt;

pub trait DebugIr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>, graph: &StatementGraph) -> fmt::Result;
}

impl<T: DebugIr + ?Sized> DebugIr for &T {
    fn fmt(&self, f: &mut fmt::Formatter<'_>, graph: &StatementGraph) -> fmt::Result {
        T::fmt(self, f, graph)
    }
}

impl DebugIr for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>, graph: &StatementGraph) -> fmt::Result {
        DebugIr::fmt(&graph.expr(*self).kind, f, graph)
    }
}

impl DebugIr for StatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>, graph: &StatementGraph) -> fmt::Result {
        graph.fmt_statement(*self, f, 0)
    }
}

impl StatementGraph {
    pub(crate) fn fmt_statement(
        &self,
        stat: StatId,
        f: &mut fmt::Formatter<'_>,
        depth: usize,
    ) -> fmt::Result {
        let indent = depth * 2;
        let statement = &self[stat];
        write!(f, "{:indent$}{} {stat}", "", statement.kind.name())?;
        match &statement.kind {
            StatKind::Do(do_stat) => {
                write!(f, " {}", do_stat.loop_kind)?;
                for (label, slot) in [
                    ("init", do_stat.init),
                    ("cond", do_stat.condition),
                    ("inc", do_stat.increment),
                ] {
                    if let Some(expr) = slot {
                        write!(f, " {label}=[{}]", self.debug(&expr))?;
                    }
                }
            }
            StatKind::If(if_stat) => write!(f, " {}", self.debug(&if_stat.head))?,
            StatKind::Switch(switch) => write!(f, " {}", self.debug(&switch.head))?,
            StatKind::Synchronized(sync) => {
                if let Some(head) = sync.head {
                    write!(f, " {}", self.debug(&head))?;
                }
            }
            _ => {}
        }
        for edge in &statement.successors {
            let edge = &self[*edge];
            write!(f, " -{}-> {}", edge.kind, edge.destination)?;
        }
        writeln!(f)?;
        for def in &statement.var_definitions {
            writeln!(f, "{:indent$}  decl {};", "", self.debug(def))?;
        }
        if let Some(exprents) = &statement.exprents {
            for expr in exprents {
                writeln!(f, "{:indent$}  {};", "", self.debug(expr))?;
            }
        }
        for child in &statement.children {
            self.fmt_statement(*child, f, depth + 1)?;
        }
        Ok(())
    }
}
