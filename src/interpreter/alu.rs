use primitive_types::U256;

use super::Interpreter;
use crate::arith;
use crate::error::ExecutionError;
use crate::gas;

impl<S> Interpreter<S> {
    /// Binary operation: the first pop is the left operand.
    pub(crate) fn alu_binary<F>(&mut self, f: F) -> Result<(), ExecutionError>
    where
        F: FnOnce(U256, U256) -> U256,
    {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;

        self.stack.push(f(a, b))?;
        self.inc_pc(0);

        Ok(())
    }

    /// Ternary operation, operands in pop order.
    pub(crate) fn alu_ternary<F>(&mut self, f: F) -> Result<(), ExecutionError>
    where
        F: FnOnce(U256, U256, U256) -> U256,
    {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        let c = self.stack.pop()?;

        self.stack.push(f(a, b, c))?;
        self.inc_pc(0);

        Ok(())
    }

    /// Binary comparison pushing one or zero.
    pub(crate) fn alu_cmp<F>(&mut self, f: F) -> Result<(), ExecutionError>
    where
        F: FnOnce(U256, U256) -> bool,
    {
        self.alu_binary(|a, b| if f(a, b) { U256::one() } else { U256::zero() })
    }

    /// Unary operation on the top of the stack.
    pub(crate) fn alu_unary<F>(&mut self, f: F) -> Result<(), ExecutionError>
    where
        F: FnOnce(U256) -> U256,
    {
        let a = self.stack.pop()?;

        self.stack.push(f(a))?;
        self.inc_pc(0);

        Ok(())
    }

    /// EXP charges per significant exponent byte on top of its static cost.
    /// Base is popped first, then the exponent.
    pub(crate) fn op_exp(&mut self) -> Result<(), ExecutionError> {
        let base = self.stack.pop()?;
        let exponent = self.stack.pop()?;

        self.gas_charge(gas::EXP + gas::exp_cost(exponent))?;
        self.stack.push(arith::exp(base, exponent))?;
        self.inc_pc(0);

        Ok(())
    }
}
