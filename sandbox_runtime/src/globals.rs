//! The restricted builtin surface available to a `function` node's body, on
//! top of Starlark's own safe core (no file I/O, no `load()`, no network).
//! See `spec.md` §4.1 "restricted evaluator" and `SPEC_FULL.md` §4.1 for the
//! rationale behind each function.

use starlark::environment::GlobalsBuilder;
use starlark::starlark_module;
use starlark::values::{Heap, Value};

use crate::json_bridge::{json_to_value, value_to_json};

#[starlark_module]
pub fn sandbox_globals(builder: &mut GlobalsBuilder) {
    fn math_sqrt(x: f64) -> anyhow::Result<f64> {
        Ok(x.sqrt())
    }
    fn math_pow(x: f64, y: f64) -> anyhow::Result<f64> {
        Ok(x.powf(y))
    }
    fn math_floor(x: f64) -> anyhow::Result<f64> {
        Ok(x.floor())
    }
    fn math_ceil(x: f64) -> anyhow::Result<f64> {
        Ok(x.ceil())
    }
    fn math_log(x: f64) -> anyhow::Result<f64> {
        Ok(x.ln())
    }
    fn math_log2(x: f64) -> anyhow::Result<f64> {
        Ok(x.log2())
    }
    fn math_log10(x: f64) -> anyhow::Result<f64> {
        Ok(x.log10())
    }
    fn math_sin(x: f64) -> anyhow::Result<f64> {
        Ok(x.sin())
    }
    fn math_cos(x: f64) -> anyhow::Result<f64> {
        Ok(x.cos())
    }
    fn math_tan(x: f64) -> anyhow::Result<f64> {
        Ok(x.tan())
    }
    fn math_atan2(y: f64, x: f64) -> anyhow::Result<f64> {
        Ok(y.atan2(x))
    }
    fn math_radians(degrees: f64) -> anyhow::Result<f64> {
        Ok(degrees.to_radians())
    }
    fn math_degrees(radians: f64) -> anyhow::Result<f64> {
        Ok(radians.to_degrees())
    }
    const MATH_PI: f64 = std::f64::consts::PI;
    const MATH_E: f64 = std::f64::consts::E;

    fn json_dumps(value: Value) -> anyhow::Result<String> {
        let json = value_to_json(value).map_err(|e| anyhow::anyhow!("json_dumps: {e}"))?;
        Ok(serde_json::to_string(&json)?)
    }

    fn json_loads<'v>(text: &str, heap: &'v Heap) -> anyhow::Result<Value<'v>> {
        let json: serde_json::Value = serde_json::from_str(text)?;
        Ok(json_to_value(heap, &json))
    }

    /// Deterministic hash-based pseudo-random number in `[0, 1)`, seeded by
    /// `seed`. There is no shared RNG state across calls: the sandbox cannot
    /// express "the next random draw", only "the draw for this seed", since a
    /// `function` node is invoked at most once per `Calculate`/`Sweep` step
    /// and nondeterministic state would not survive that.
    fn random_uniform(seed: i32) -> anyhow::Result<f64> {
        let mut x = seed as u64 ^ 0x9E3779B97F4A7C15;
        x ^= x >> 33;
        x = x.wrapping_mul(0xFF51AFD7ED558CCD);
        x ^= x >> 33;
        x = x.wrapping_mul(0xC4CEB9FE1A85EC53);
        x ^= x >> 33;
        Ok((x % 1_000_000) as f64 / 1_000_000.0)
    }

    fn functools_reduce<'v>(
        function: Value<'v>,
        items: Vec<Value<'v>>,
        eval: &mut starlark::eval::Evaluator<'v, '_, '_>,
    ) -> anyhow::Result<Value<'v>> {
        let mut iter = items.into_iter();
        let mut acc = iter
            .next()
            .ok_or_else(|| anyhow::anyhow!("functools_reduce: empty sequence"))?;
        for item in iter {
            acc = eval.eval_function(function, &[acc, item], &[])?;
        }
        Ok(acc)
    }
}
