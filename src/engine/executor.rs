//! Effect execution
//!
//! The engine hands every fired bolt to an [`EffectExecutor`]. A failing
//! effect must leave the executor's state exactly as it was; the queue slot
//! the bolt occupied is consumed either way.
//!
//! [`Ledger`] is an in-memory executor: native balances per address plus an
//! optional [`Program`] (code) per address.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::abi::{AbiError, FunctionSignature};
use crate::core::{Action, CallMode};
use crate::crypto::{Address, U256};

/// Effect failures, surfaced to whoever triggered the fire
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EffectError {
    #[error("Insufficient balance in {account}: need {needed}, have {available}")]
    InsufficientBalance {
        account: Address,
        needed: U256,
        available: U256,
    },
    #[error("Balance overflow in {0}")]
    BalanceOverflow(Address),
    #[error("Call reverted: {0}")]
    Reverted(String),
    #[error("Bad calldata: {0}")]
    BadCalldata(#[from] AbiError),
}

/// The call a fired bolt performs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectCall {
    pub target: Address,
    pub value: U256,
    pub payload: Vec<u8>,
    pub mode: CallMode,
}

impl From<&Action> for EffectCall {
    fn from(action: &Action) -> Self {
        Self {
            target: action.target,
            value: action.value,
            payload: action.payload.clone(),
            mode: action.mode,
        }
    }
}

/// Performs calls on behalf of an engine
pub trait EffectExecutor {
    /// Execute `call` with `engine` as the caller; returns the call's output
    fn execute(&mut self, engine: Address, call: &EffectCall) -> Result<Vec<u8>, EffectError>;
}

/// State a program runs against
///
/// A context is itself an [`EffectExecutor`], so code can make further
/// calls (including into another engine) against the same balances.
pub struct CallContext<'a> {
    /// Identity whose balance the code acts on
    pub this: Address,
    pub caller: Address,
    /// Value sent along with the call
    pub value: U256,
    balances: &'a mut HashMap<Address, U256>,
    code: &'a HashMap<Address, Arc<dyn Program>>,
}

impl CallContext<'_> {
    pub fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    pub fn has_code(&self, account: &Address) -> bool {
        self.code.contains_key(account)
    }

    /// Move `amount` from `from` to `to`
    pub fn transfer(&mut self, from: Address, to: Address, amount: U256) -> Result<(), EffectError> {
        transfer(&mut *self.balances, from, to, amount)
    }
}

impl EffectExecutor for CallContext<'_> {
    fn execute(&mut self, engine: Address, call: &EffectCall) -> Result<Vec<u8>, EffectError> {
        execute_atomically(&mut *self.balances, self.code, engine, call)
    }
}

/// Code attached to an address
pub trait Program: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, ctx: &mut CallContext<'_>, payload: &[u8]) -> Result<Vec<u8>, EffectError>;
}

/// Pays out of `this` on `transfer(address,uint256)`
#[derive(Debug, Clone, Copy, Default)]
pub struct TransferProgram;

impl TransferProgram {
    pub const SIGNATURE: &'static str = "function transfer(address to, uint amount)";
}

impl Program for TransferProgram {
    fn name(&self) -> &str {
        "transfer"
    }

    fn run(&self, ctx: &mut CallContext<'_>, payload: &[u8]) -> Result<Vec<u8>, EffectError> {
        let signature = FunctionSignature::parse(Self::SIGNATURE)?;
        if !signature.matches(payload) {
            return Err(EffectError::Reverted("unknown function".to_string()));
        }

        let args = signature.decode_call(payload)?;
        let (to, amount) = match (args[0].as_address(), args[1].as_uint()) {
            (Some(to), Some(amount)) => (to, amount),
            _ => return Err(EffectError::Reverted("bad arguments".to_string())),
        };
        let this = ctx.this;
        ctx.transfer(this, to, amount)?;
        Ok(Vec::new())
    }
}

fn transfer(
    balances: &mut HashMap<Address, U256>,
    from: Address,
    to: Address,
    amount: U256,
) -> Result<(), EffectError> {
    if amount.is_zero() || from == to {
        return Ok(());
    }
    let available = balances.get(&from).copied().unwrap_or_default();
    if available < amount {
        return Err(EffectError::InsufficientBalance {
            account: from,
            needed: amount,
            available,
        });
    }
    let credited = balances
        .get(&to)
        .copied()
        .unwrap_or_default()
        .checked_add(amount)
        .ok_or(EffectError::BalanceOverflow(to))?;
    balances.insert(from, available - amount);
    balances.insert(to, credited);
    Ok(())
}

fn run_call(
    balances: &mut HashMap<Address, U256>,
    code: &HashMap<Address, Arc<dyn Program>>,
    engine: Address,
    call: &EffectCall,
) -> Result<Vec<u8>, EffectError> {
    let program = code.get(&call.target).cloned();

    let this = match call.mode {
        CallMode::DirectCall => {
            transfer(balances, engine, call.target, call.value)?;
            call.target
        }
        // Delegated code acts as the engine; no value moves to the target
        CallMode::DelegatedCall => engine,
    };

    match program {
        Some(program) => {
            log::debug!("Running {} at {} as {}", program.name(), call.target, this);
            let mut ctx = CallContext {
                this,
                caller: engine,
                value: call.value,
                balances,
                code,
            };
            program.run(&mut ctx, &call.payload)
        }
        None => Ok(Vec::new()),
    }
}

/// Run a call, restoring every balance if it fails
fn execute_atomically(
    balances: &mut HashMap<Address, U256>,
    code: &HashMap<Address, Arc<dyn Program>>,
    engine: Address,
    call: &EffectCall,
) -> Result<Vec<u8>, EffectError> {
    let snapshot = balances.clone();
    let result = run_call(balances, code, engine, call);
    if result.is_err() {
        *balances = snapshot;
    }
    result
}

/// In-memory balances and code
#[derive(Default)]
pub struct Ledger {
    balances: HashMap<Address, U256>,
    code: HashMap<Address, Arc<dyn Program>>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance(&self, account: &Address) -> U256 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Mint `amount` into `account`
    pub fn credit(&mut self, account: Address, amount: U256) {
        let entry = self.balances.entry(account).or_default();
        *entry = entry.saturating_add(amount);
    }

    /// Attach code to `account`, replacing any previous program
    pub fn deploy(&mut self, account: Address, program: Arc<dyn Program>) {
        self.code.insert(account, program);
    }

    pub fn has_code(&self, account: &Address) -> bool {
        self.code.contains_key(account)
    }
}

impl EffectExecutor for Ledger {
    fn execute(&mut self, engine: Address, call: &EffectCall) -> Result<Vec<u8>, EffectError> {
        execute_atomically(&mut self.balances, &self.code, engine, call)
    }
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let programs: HashMap<&Address, &str> =
            self.code.iter().map(|(a, p)| (a, p.name())).collect();
        f.debug_struct("Ledger")
            .field("balances", &self.balances)
            .field("code", &programs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::u256_word;

    fn addr(last: u8) -> Address {
        Address::with_last_byte(last)
    }

    fn units(n: u64) -> U256 {
        U256::from(n)
    }

    fn transfer_payload(to: Address, amount: u64) -> Vec<u8> {
        FunctionSignature::parse(TransferProgram::SIGNATURE)
            .unwrap()
            .encode_call_str(&[to.to_string(), amount.to_string()])
            .unwrap()
    }

    struct Reverter;

    impl Program for Reverter {
        fn name(&self) -> &str {
            "reverter"
        }

        fn run(&self, _ctx: &mut CallContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, EffectError> {
            Err(EffectError::Reverted("always".to_string()))
        }
    }

    /// Returns `caller ∥ value ∥ has_code(caller)`
    struct Echo;

    impl Program for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn run(&self, ctx: &mut CallContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, EffectError> {
            let mut out = ctx.caller.into_word().to_vec();
            out.extend_from_slice(u256_word(ctx.value).as_slice());
            out.push(u8::from(ctx.has_code(&ctx.caller)));
            Ok(out)
        }
    }

    /// Pays `to` from `this`, then forwards a call that may fail
    struct Forwarder {
        to: Address,
        next: EffectCall,
    }

    impl Program for Forwarder {
        fn name(&self) -> &str {
            "forwarder"
        }

        fn run(&self, ctx: &mut CallContext<'_>, _payload: &[u8]) -> Result<Vec<u8>, EffectError> {
            let this = ctx.this;
            ctx.transfer(this, self.to, units(1))?;
            ctx.execute(this, &self.next)
        }
    }

    #[test]
    fn test_direct_call_moves_value() {
        let engine = addr(1);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(10));

        let call = EffectCall {
            target: addr(2),
            value: units(4),
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        ledger.execute(engine, &call).unwrap();
        assert_eq!(ledger.balance(&engine), units(6));
        assert_eq!(ledger.balance(&addr(2)), units(4));
    }

    #[test]
    fn test_insufficient_balance_leaves_state_unchanged() {
        let engine = addr(1);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(1));

        let call = EffectCall {
            target: addr(2),
            value: units(4),
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        assert_eq!(
            ledger.execute(engine, &call),
            Err(EffectError::InsufficientBalance {
                account: engine,
                needed: units(4),
                available: units(1)
            })
        );
        assert_eq!(ledger.balance(&engine), units(1));
        assert_eq!(ledger.balance(&addr(2)), U256::ZERO);
    }

    #[test]
    fn test_credit_saturates() {
        let mut ledger = Ledger::new();
        ledger.credit(addr(1), U256::MAX);
        ledger.credit(addr(1), units(1));
        assert_eq!(ledger.balance(&addr(1)), U256::MAX);

        let call = EffectCall {
            target: addr(2),
            value: units(1),
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        ledger.credit(addr(2), U256::MAX);
        ledger.credit(addr(3), units(1));
        assert_eq!(
            ledger.execute(addr(3), &call),
            Err(EffectError::BalanceOverflow(addr(2)))
        );
    }

    #[test]
    fn test_revert_rolls_back_value_transfer() {
        let engine = addr(1);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(10));
        ledger.deploy(addr(2), Arc::new(Reverter));
        assert!(ledger.has_code(&addr(2)));
        assert!(!ledger.has_code(&engine));

        let call = EffectCall {
            target: addr(2),
            value: units(3),
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        assert!(ledger.execute(engine, &call).is_err());
        assert_eq!(ledger.balance(&engine), units(10));
        assert_eq!(ledger.balance(&addr(2)), U256::ZERO);
    }

    #[test]
    fn test_program_sees_caller_and_value() {
        let engine = addr(1);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(10));
        ledger.deploy(addr(2), Arc::new(Echo));
        ledger.deploy(engine, Arc::new(Reverter));

        let call = EffectCall {
            target: addr(2),
            value: units(3),
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        let output = ledger.execute(engine, &call).unwrap();
        assert_eq!(&output[..32], engine.into_word().as_slice());
        assert_eq!(&output[32..64], u256_word(units(3)).as_slice());
        assert_eq!(output[64], 1);
        assert_eq!(ledger.balance(&addr(2)), units(3));
    }

    #[test]
    fn test_program_runs_as_target_on_direct_call() {
        let engine = addr(1);
        let program = addr(2);
        let recipient = addr(3);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(10));
        ledger.credit(program, units(10));
        ledger.deploy(program, Arc::new(TransferProgram));

        let call = EffectCall {
            target: program,
            value: U256::ZERO,
            payload: transfer_payload(recipient, 7),
            mode: CallMode::DirectCall,
        };
        ledger.execute(engine, &call).unwrap();
        assert_eq!(ledger.balance(&engine), units(10));
        assert_eq!(ledger.balance(&program), units(3));
        assert_eq!(ledger.balance(&recipient), units(7));
    }

    #[test]
    fn test_program_runs_as_engine_on_delegated_call() {
        let engine = addr(1);
        let program = addr(2);
        let recipient = addr(3);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(10));
        ledger.credit(program, units(10));
        ledger.deploy(program, Arc::new(TransferProgram));

        let call = EffectCall {
            target: program,
            value: U256::ZERO,
            payload: transfer_payload(recipient, 7),
            mode: CallMode::DelegatedCall,
        };
        ledger.execute(engine, &call).unwrap();
        assert_eq!(ledger.balance(&engine), units(3));
        assert_eq!(ledger.balance(&program), units(10));
        assert_eq!(ledger.balance(&recipient), units(7));
    }

    #[test]
    fn test_delegated_call_without_code_is_noop() {
        let engine = addr(1);
        let mut ledger = Ledger::new();
        ledger.credit(engine, units(10));

        let call = EffectCall {
            target: addr(9),
            value: units(5),
            payload: Vec::new(),
            mode: CallMode::DelegatedCall,
        };
        assert_eq!(ledger.execute(engine, &call).unwrap(), Vec::<u8>::new());
        assert_eq!(ledger.balance(&engine), units(10));
        assert_eq!(ledger.balance(&addr(9)), U256::ZERO);
    }

    #[test]
    fn test_unknown_selector_reverts() {
        let engine = addr(1);
        let mut ledger = Ledger::new();
        ledger.deploy(addr(2), Arc::new(TransferProgram));

        let call = EffectCall {
            target: addr(2),
            value: U256::ZERO,
            payload: vec![0xde, 0xad, 0xbe, 0xef],
            mode: CallMode::DirectCall,
        };
        assert!(matches!(
            ledger.execute(engine, &call),
            Err(EffectError::Reverted(_))
        ));
    }

    #[test]
    fn test_nested_call_shares_balances() {
        let engine = addr(1);
        let forwarder = addr(2);
        let mut ledger = Ledger::new();
        ledger.credit(forwarder, units(5));
        ledger.deploy(
            forwarder,
            Arc::new(Forwarder {
                to: addr(3),
                next: EffectCall {
                    target: addr(4),
                    value: units(2),
                    payload: Vec::new(),
                    mode: CallMode::DirectCall,
                },
            }),
        );

        let call = EffectCall {
            target: forwarder,
            value: U256::ZERO,
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        ledger.execute(engine, &call).unwrap();
        assert_eq!(ledger.balance(&forwarder), units(2));
        assert_eq!(ledger.balance(&addr(3)), units(1));
        assert_eq!(ledger.balance(&addr(4)), units(2));
    }

    #[test]
    fn test_failed_nested_call_rolls_back_outer_changes() {
        let engine = addr(1);
        let forwarder = addr(2);
        let mut ledger = Ledger::new();
        ledger.credit(forwarder, units(5));
        ledger.deploy(addr(4), Arc::new(Reverter));
        ledger.deploy(
            forwarder,
            Arc::new(Forwarder {
                to: addr(3),
                next: EffectCall {
                    target: addr(4),
                    value: units(2),
                    payload: Vec::new(),
                    mode: CallMode::DirectCall,
                },
            }),
        );

        let call = EffectCall {
            target: forwarder,
            value: U256::ZERO,
            payload: Vec::new(),
            mode: CallMode::DirectCall,
        };
        assert!(ledger.execute(engine, &call).is_err());
        assert_eq!(ledger.balance(&forwarder), units(5));
        assert_eq!(ledger.balance(&addr(3)), U256::ZERO);
        assert_eq!(ledger.balance(&addr(4)), U256::ZERO);
    }
}
