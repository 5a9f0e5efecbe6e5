//! Engines as callable code
//!
//! [`EngineProgram`] exposes an engine's `load` and `fire` as calldata so one
//! engine's action can drive another. The inner engine performs its effect
//! against the caller's [`CallContext`], so value moves inside the same
//! ledger, and a failure rolls back with the outer call.
//!
//! The inner engine's queue is not part of that ledger: a nonce it consumes
//! stays consumed even if the outer call later reverts.

use crate::abi::{FunctionSignature, Token};
use crate::core::{Action, CallMode};
use crate::crypto::{u64_word, U256};
use crate::engine::engine::LoadOutcome;
use crate::engine::executor::{CallContext, EffectError, EffectExecutor, Program};
use crate::engine::shared::SharedEngine;
use crate::multisig::SignatureBundle;

/// Program backed by a shared engine
pub struct EngineProgram<E: EffectExecutor> {
    engine: SharedEngine<E>,
}

impl<E: EffectExecutor> EngineProgram<E> {
    pub const LOAD: &'static str = "function load(uint8[] v, bytes32[] r, bytes32[] s, address target, uint256 value, bytes payload, uint256 expiry, bool delegate)";
    pub const FIRE: &'static str = "function fire()";

    pub fn new(engine: SharedEngine<E>) -> Self {
        Self { engine }
    }

    /// Calldata that loads `action` with `signatures` into the engine
    pub fn load_calldata(
        action: &Action,
        signatures: &SignatureBundle,
    ) -> Result<Vec<u8>, EffectError> {
        let signature = FunctionSignature::parse(Self::LOAD)?;
        signature
            .encode_call(&[
                Token::Array(
                    signatures
                        .v
                        .iter()
                        .map(|v| Token::Uint(U256::from(*v)))
                        .collect(),
                ),
                Token::Array(signatures.r.iter().map(|r| Token::Bytes32(*r)).collect()),
                Token::Array(signatures.s.iter().map(|s| Token::Bytes32(*s)).collect()),
                Token::Address(action.target),
                Token::Uint(action.value),
                Token::Bytes(action.payload.clone()),
                Token::Uint(U256::from(action.expiry)),
                Token::Bool(action.mode == CallMode::DelegatedCall),
            ])
            .map_err(EffectError::from)
    }

    pub fn fire_calldata() -> Result<Vec<u8>, EffectError> {
        Ok(FunctionSignature::parse(Self::FIRE)?.encode_call(&[])?)
    }

    fn run_load(&self, ctx: &mut CallContext<'_>, payload: &[u8]) -> Result<Vec<u8>, EffectError> {
        let args = FunctionSignature::parse(Self::LOAD)?.decode_call(payload)?;
        let (action, signatures) = decode_load(&args).ok_or_else(|| bad_arguments("load"))?;

        let outcome = self
            .engine
            .try_with(|engine| engine.load_with(action, &signatures, ctx))
            .and_then(|result| result)
            .map_err(|e| EffectError::Reverted(e.to_string()))?;

        Ok(match outcome {
            LoadOutcome::Executed { output, .. } => output,
            LoadOutcome::Queued { nonce, .. } => u64_word(nonce).to_vec(),
        })
    }

    fn run_fire(&self, ctx: &mut CallContext<'_>) -> Result<Vec<u8>, EffectError> {
        let fired = self
            .engine
            .try_with(|engine| engine.fire_with(ctx))
            .and_then(|result| result)
            .map_err(|e| EffectError::Reverted(e.to_string()))?;
        Ok(fired.output)
    }
}

fn bad_arguments(function: &str) -> EffectError {
    EffectError::Reverted(format!("bad arguments to {}", function))
}

fn to_u64(value: U256) -> Option<u64> {
    (value.bit_len() <= 64).then(|| value.as_limbs()[0])
}

fn decode_load(args: &[Token]) -> Option<(Action, SignatureBundle)> {
    let v = args
        .first()?
        .as_array()?
        .iter()
        .map(|t| t.as_uint().and_then(to_u64).and_then(|v| u8::try_from(v).ok()))
        .collect::<Option<Vec<u8>>>()?;
    let r = args
        .get(1)?
        .as_array()?
        .iter()
        .map(Token::as_bytes32)
        .collect::<Option<Vec<_>>>()?;
    let s = args
        .get(2)?
        .as_array()?
        .iter()
        .map(Token::as_bytes32)
        .collect::<Option<Vec<_>>>()?;

    let action = Action {
        target: args.get(3)?.as_address()?,
        value: args.get(4)?.as_uint()?,
        payload: args.get(5)?.as_bytes()?.to_vec(),
        mode: if args.get(7)?.as_bool()? {
            CallMode::DelegatedCall
        } else {
            CallMode::DirectCall
        },
        expiry: to_u64(args.get(6)?.as_uint()?)?,
    };
    Some((action, SignatureBundle { v, r, s }))
}

impl<E: EffectExecutor + Send + 'static> Program for EngineProgram<E> {
    fn name(&self) -> &str {
        "engine"
    }

    fn run(&self, ctx: &mut CallContext<'_>, payload: &[u8]) -> Result<Vec<u8>, EffectError> {
        let own = self
            .engine
            .try_with(|engine| engine.address())
            .map_err(|e| EffectError::Reverted(e.to_string()))?;
        // Delegated code would act as the caller, which is not this engine
        if ctx.this != own {
            return Err(EffectError::Reverted(format!(
                "engine {} must be called directly, not as {}",
                own, ctx.this
            )));
        }
        log::debug!("Engine {} called by {}", own, ctx.caller);

        if FunctionSignature::parse(Self::LOAD)?.matches(payload) {
            self.run_load(ctx, payload)
        } else if FunctionSignature::parse(Self::FIRE)?.matches(payload) {
            self.run_fire(ctx)
        } else {
            Err(EffectError::Reverted("unknown function".to_string()))
        }
    }
}
