use super::{BytecodeOffsets, ExprId, Exprent, FunctionKind, StatId, StatementGraph};

impl StatementGraph {
    pub fn add_offsets(&mut self, target: ExprId, offsets: &BytecodeOffsets) {
        self.offsets_mut(target).union_with(offsets);
    }

    /// Folds the offsets of `source` and its whole subtree into `target`. Used whenever `source` is
    /// about to disappear from the tree.
    pub fn absorb_offsets(&mut self, target: ExprId, source: ExprId) {
        let offsets = self.tree_offsets(source);
        self.add_offsets(target, &offsets);
    }

    /// Logical negation of a condition, cancelling an existing `!` instead of stacking another one.
    pub fn negate(&mut self, condition: ExprId) -> ExprId {
        if let Exprent::Function {
            kind: FunctionKind::BoolNot,
            operands,
        } = &self[condition]
            && let [inner] = operands[..]
        {
            let own = self.offsets(condition).clone();
            self.add_offsets(inner, &own);
            return inner;
        }
        self.alloc_expr(Exprent::Function {
            kind: FunctionKind::BoolNot,
            operands: vec![condition],
        })
    }

    pub fn uncast(&self, mut id: ExprId) -> ExprId {
        while let Exprent::Function {
            kind: FunctionKind::Cast,
            operands,
        } = &self[id]
            && let Some(inner) = operands.first()
        {
            id = *inner;
        }
        id
    }

    // Strips `!` wrappers and comparisons against a constant, leaving the boolean-valued
    // expression being tested.
    pub fn drill_nots(&self, mut id: ExprId) -> ExprId {
        loop {
            match &self[id] {
                Exprent::Function {
                    kind: FunctionKind::BoolNot,
                    operands,
                } if operands.len() == 1 => id = operands[0],
                Exprent::Function {
                    kind: FunctionKind::Eq | FunctionKind::Ne,
                    operands,
                } if operands.len() == 2 => return operands[0],
                _ => return id,
            }
        }
    }

    /// Structural equality, ignoring offsets and declaration markers.
    pub fn expr_equals(&self, a: ExprId, b: ExprId) -> bool {
        if a == b {
            return true;
        }
        let same_node = match (&self[a], &self[b]) {
            (Exprent::Var(x), Exprent::Var(y)) => x.pair() == y.pair(),
            (
                Exprent::Const { ty: tx, value: x },
                Exprent::Const { ty: ty_, value: y },
            ) => tx == ty_ && x == y,
            (Exprent::Function { kind: x, .. }, Exprent::Function { kind: y, .. }) => x == y,
            (Exprent::Invocation(x), Exprent::Invocation(y)) => {
                x.class == y.class
                    && x.name == y.name
                    && x.descriptor == y.descriptor
                    && x.instance.is_some() == y.instance.is_some()
            }
            (
                Exprent::Field {
                    instance: ix,
                    class: cx,
                    name: nx,
                    descriptor: dx,
                },
                Exprent::Field {
                    instance: iy,
                    class: cy,
                    name: ny,
                    descriptor: dy,
                },
            ) => ix.is_some() == iy.is_some() && cx == cy && nx == ny && dx == dy,
            (Exprent::Monitor { kind: x, .. }, Exprent::Monitor { kind: y, .. }) => x == y,
            (Exprent::Exit { kind: x, value: vx }, Exprent::Exit { kind: y, value: vy }) => {
                x == y && vx.is_some() == vy.is_some()
            }
            (Exprent::New { class: x, .. }, Exprent::New { class: y, .. }) => x == y,
            (Exprent::Assignment { .. }, Exprent::Assignment { .. })
            | (Exprent::Array { .. }, Exprent::Array { .. })
            | (Exprent::If { .. }, Exprent::If { .. }) => true,
            _ => false,
        };
        if !same_node {
            return false;
        }
        let xs: Vec<ExprId> = self[a].subexprs().collect();
        let ys: Vec<ExprId> = self[b].subexprs().collect();
        xs.len() == ys.len() && xs.into_iter().zip(ys).all(|(x, y)| self.expr_equals(x, y))
    }

    /// Removes a top-level expression from a leaf. Returns whether it was there.
    pub fn remove_exprent(&mut self, stat: StatId, expr: ExprId) -> bool {
        let Some(exprents) = self[stat].exprents.as_mut() else {
            return false;
        };
        let len = exprents.len();
        exprents.retain(|e| *e != expr);
        exprents.len() != len
    }

    pub fn last_exprent(&self, stat: StatId) -> Option<ExprId> {
        self[stat].exprents.as_ref()?.last().copied()
    }
}
