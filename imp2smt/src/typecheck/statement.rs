use crate::ast::{Assign, Block, Else, If, Stmt};
use crate::utils::{ExprContext, TypeContext, TypeError, ValueType, RESERVED};

use super::Checker;

impl Checker<'_> {
    pub(crate) fn check_block(
        &mut self,
        block: &Block,
        env: &mut TypeContext,
    ) -> Result<(), TypeError> {
        for stmt in &block.stmts {
            self.check_stmt(stmt, env)?;
        }
        Ok(())
    }

    fn check_stmt(&mut self, stmt: &Stmt, env: &mut TypeContext) -> Result<(), TypeError> {
        match stmt {
            Stmt::Assign(a) => self.check_assign(a, env),
            Stmt::If(i) => self.check_if(i, env),
            Stmt::While(w) => {
                if let Some(invariant) = &w.invariant {
                    self.typecheck_root(invariant, ValueType::Bool, env, ExprContext::Metacondition)?;
                }
                if let Some(variant) = &w.variant {
                    self.typecheck_root(variant, ValueType::Int, env, ExprContext::Metacondition)?;
                }
                self.typecheck(&w.cond, ValueType::Bool, env, ExprContext::Code)?;
                self.check_block(&w.body, env)
            }
            Stmt::Assert(a) => self.typecheck(&a.cond, ValueType::Bool, env, ExprContext::Code),
            Stmt::Return(r) => self.typecheck(&r.value, ValueType::Int, env, ExprContext::Code),
            Stmt::Block(b) => self.check_block(b, env),
        }
    }

    fn check_if(&mut self, i: &If, env: &mut TypeContext) -> Result<(), TypeError> {
        self.typecheck(&i.cond, ValueType::Bool, env, ExprContext::Code)?;
        self.check_block(&i.then_branch, env)?;
        match &i.else_branch {
            Else::Block(b) => self.check_block(b, env),
            Else::If(nested) => self.check_if(nested, env),
        }
    }

    fn check_assign(&mut self, a: &Assign, env: &mut TypeContext) -> Result<(), TypeError> {
        let actual = self.typeof_root(&a.value, env, ExprContext::AssignmentRhs)?;
        if RESERVED.contains(a.dest.name.as_str()) {
            return Err(TypeError::ReservedName {
                loc: a.dest.loc,
                name: a.dest.name.clone(),
            });
        }
        if env.is_param(&a.dest.name) {
            return Err(TypeError::ParameterReassignment {
                loc: a.loc,
                name: a.dest.name.clone(),
            });
        }
        match env.get(&a.dest.name) {
            None => env.declare(&a.dest.name, actual),
            Some(old) if old != actual => {
                return Err(TypeError::Mismatch {
                    loc: a.loc,
                    expected: old,
                    actual,
                })
            }
            Some(_) => {}
        }
        Ok(())
    }
}

/// The return-on-all-paths rule: control may not fall off the end of a
/// procedure. A block returns if any of its statements is a return, or if a
/// statement is a conditional both of whose arms return.
pub(crate) fn block_returns(block: &Block) -> bool {
    block.stmts.iter().any(stmt_returns)
}

fn stmt_returns(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Return(_) => true,
        Stmt::If(i) => if_returns(i),
        Stmt::Block(b) => block_returns(b),
        _ => false,
    }
}

fn if_returns(i: &If) -> bool {
    block_returns(&i.then_branch)
        && match &i.else_branch {
            Else::Block(b) => block_returns(b),
            Else::If(nested) => if_returns(nested),
        }
}
