//! Builds the execution context for one script run.
//!
//! The engine starts empty (`Engine::new_raw`) and only the packages and modules listed here
//! are registered. Anything not listed does not exist inside the script: no file or module
//! loading, no `eval`, no clocks or `sleep`, no binary blobs, no output streams. Arrays,
//! maps and strings are capped in size so a script cannot exhaust memory.

use crate::config::EngineConfig;
use crate::deep;
use crate::pathquery;
use rhai::module_resolvers::DummyModuleResolver;
use rhai::packages::{
    ArithmeticPackage, BasicArrayPackage, BasicFnPackage, BasicIteratorPackage, BasicMapPackage,
    BasicMathPackage, BasicStringPackage, BitFieldPackage, LogicPackage, MoreStringPackage,
    Package,
};
use rhai::{Array, Dynamic, Engine, EvalAltResult, ImmutableString, Module, Scope};
use serde_json::Value;
use std::time::Instant;

/// Name under which the loaded value(s) are visible to scripts.
pub const DATA_BINDING: &str = "data";
pub const UTIL_MODULE: &str = "util";
pub const JP_MODULE: &str = "jp";

/// Operations between two deadline checks.
const PROGRESS_STRIDE: u64 = 256;

type FnResult<T> = Result<T, Box<EvalAltResult>>;

pub(crate) fn to_json(value: &Dynamic) -> FnResult<Value> {
    rhai::serde::from_dynamic::<Value>(value)
}

pub(crate) fn to_script(value: &Value) -> FnResult<Dynamic> {
    rhai::serde::to_dynamic(value)
}

fn to_script_list(values: Vec<Value>) -> FnResult<Dynamic> {
    to_script(&Value::Array(values))
}

fn string_list(value: &Array) -> Vec<String> {
    value
        .iter()
        .map(|item| {
            item.clone()
                .into_immutable_string()
                .map(|s| s.to_string())
                .unwrap_or_else(|_| item.to_string())
        })
        .collect()
}

fn json_array(value: &Dynamic) -> FnResult<Vec<Value>> {
    match to_json(value)? {
        Value::Array(items) => Ok(items),
        other => Err(format!("expected an array, got {other}").into()),
    }
}

fn jp_module() -> Module {
    let mut module = Module::new();
    module.set_native_fn("query", |value: Dynamic, path: ImmutableString| {
        let json = to_json(&value)?;
        let found = pathquery::query(&json, path.as_str(), None).map_err(|e| e.to_string())?;
        to_script_list(found)
    });
    module.set_native_fn(
        "query",
        |value: Dynamic, path: ImmutableString, count: rhai::INT| {
            let json = to_json(&value)?;
            let count = usize::try_from(count).unwrap_or(0);
            let found = pathquery::query(&json, path.as_str(), Some(count)).map_err(|e| e.to_string())?;
            to_script_list(found)
        },
    );
    module.set_native_fn("nodes", |value: Dynamic, path: ImmutableString| {
        let json = to_json(&value)?;
        let found = pathquery::nodes(&json, path.as_str(), None).map_err(|e| e.to_string())?;
        let rendered = serde_json::to_value(found).map_err(|e| e.to_string())?;
        to_script(&rendered)
    });
    module.set_native_fn("paths", |value: Dynamic, path: ImmutableString| {
        let json = to_json(&value)?;
        let found = pathquery::nodes(&json, path.as_str(), None).map_err(|e| e.to_string())?;
        let paths = found
            .into_iter()
            .map(|node| serde_json::to_value(node.path).unwrap_or(Value::Null))
            .collect();
        to_script_list(paths)
    });
    module.set_native_fn("value", |value: Dynamic, path: ImmutableString| {
        let json = to_json(&value)?;
        let found = pathquery::query(&json, path.as_str(), Some(1)).map_err(|e| e.to_string())?;
        match found.into_iter().next() {
            Some(first) => to_script(&first),
            None => Ok(Dynamic::UNIT),
        }
    });
    module
}

fn util_module(max_array_size: usize) -> Module {
    let mut module = Module::new();
    module.set_native_fn("get", |value: Dynamic, path: ImmutableString| {
        let json = to_json(&value)?;
        match deep::get(&json, path.as_str()) {
            Some(found) => to_script(found),
            None => Ok(Dynamic::UNIT),
        }
    });
    module.set_native_fn(
        "get",
        |value: Dynamic, path: ImmutableString, default: Dynamic| {
            let json = to_json(&value)?;
            match deep::get(&json, path.as_str()) {
                Some(found) => to_script(found),
                None => Ok(default),
            }
        },
    );
    module.set_native_fn("has", |value: Dynamic, path: ImmutableString| -> FnResult<bool> {
        Ok(deep::has(&to_json(&value)?, path.as_str()))
    });
    module.set_native_fn(
        "set",
        move |value: Dynamic, path: ImmutableString, new: Dynamic| {
            let updated =
                deep::set(&to_json(&value)?, path.as_str(), to_json(&new)?, max_array_size)?;
            to_script(&updated)
        },
    );
    module.set_native_fn("unset", |value: Dynamic, path: ImmutableString| {
        to_script(&deep::unset(&to_json(&value)?, path.as_str()))
    });
    module.set_native_fn("merge", |base: Dynamic, overlay: Dynamic| {
        to_script(&deep::merge(&to_json(&base)?, &to_json(&overlay)?))
    });
    module.set_native_fn("pick", |value: Dynamic, keys: Array| {
        to_script(&deep::pick(&to_json(&value)?, &string_list(&keys)))
    });
    module.set_native_fn("omit", |value: Dynamic, keys: Array| {
        to_script(&deep::omit(&to_json(&value)?, &string_list(&keys)))
    });
    module.set_native_fn("keys", |value: Dynamic| {
        to_script_list(deep::keys(&to_json(&value)?))
    });
    module.set_native_fn("values", |value: Dynamic| {
        to_script_list(deep::values(&to_json(&value)?))
    });
    module.set_native_fn("uniq", |items: Dynamic| {
        to_script_list(deep::uniq(&json_array(&items)?))
    });
    module.set_native_fn("flatten", |items: Dynamic| {
        to_script_list(deep::flatten(&json_array(&items)?))
    });
    module.set_native_fn("flatten_deep", |items: Dynamic| {
        to_script_list(deep::flatten_deep(&json_array(&items)?))
    });
    module.set_native_fn("chunk", |items: Dynamic, size: rhai::INT| {
        let size = usize::try_from(size).unwrap_or(1);
        to_script_list(deep::chunk(&json_array(&items)?, size))
    });
    module.set_native_fn("is_equal", |left: Dynamic, right: Dynamic| -> FnResult<bool> {
        Ok(to_json(&left)? == to_json(&right)?)
    });
    module.set_native_fn("sum", |items: Dynamic| {
        to_script(&deep::sum(&json_array(&items)?))
    });
    module.set_native_fn("sort_by", |items: Dynamic, path: ImmutableString| {
        to_script_list(deep::sort_by(&json_array(&items)?, path.as_str()))
    });
    module.set_native_fn("group_by", |items: Dynamic, path: ImmutableString| {
        to_script(&deep::group_by(&json_array(&items)?, path.as_str()))
    });
    module.set_native_fn("count_by", |items: Dynamic, path: ImmutableString| {
        to_script(&deep::count_by(&json_array(&items)?, path.as_str()))
    });
    module.set_native_fn("key_by", |items: Dynamic, path: ImmutableString| {
        to_script(&deep::key_by(&json_array(&items)?, path.as_str()))
    });
    module
}

/// A fresh engine plus the scope holding the loaded data. Nothing is shared between runs.
pub struct Sandbox {
    pub engine: Engine,
    pub scope: Scope<'static>,
}

impl Sandbox {
    /// Builds the allow-listed engine. The deadline clock starts here.
    pub fn new(input: &Value, config: &EngineConfig) -> FnResult<Self> {
        let mut engine = Engine::new_raw();

        // CorePackage is left out: it carries `sleep`, which would block past the deadline.
        engine.register_global_module(ArithmeticPackage::new().as_shared_module());
        engine.register_global_module(LogicPackage::new().as_shared_module());
        engine.register_global_module(BasicStringPackage::new().as_shared_module());
        engine.register_global_module(BasicIteratorPackage::new().as_shared_module());
        engine.register_global_module(BasicFnPackage::new().as_shared_module());
        engine.register_global_module(BasicArrayPackage::new().as_shared_module());
        engine.register_global_module(BasicMapPackage::new().as_shared_module());
        engine.register_global_module(BasicMathPackage::new().as_shared_module());
        engine.register_global_module(MoreStringPackage::new().as_shared_module());
        engine.register_global_module(BitFieldPackage::new().as_shared_module());

        engine.register_static_module(
            UTIL_MODULE,
            util_module(config.max_array_size).into(),
        );
        engine.register_static_module(JP_MODULE, jp_module().into());

        engine.set_module_resolver(DummyModuleResolver::new());
        engine.disable_symbol("eval");
        engine.on_print(|_| {});
        engine.on_debug(|_, _, _| {});

        engine.set_max_call_levels(config.max_call_levels);
        engine.set_max_expr_depths(config.max_expr_depth, config.max_expr_depth);
        engine.set_max_array_size(config.max_array_size);
        engine.set_max_map_size(config.max_map_size);
        engine.set_max_string_size(config.max_string_size);

        let started = Instant::now();
        let budget = config.timeout;
        engine.on_progress(move |ops| {
            if ops % PROGRESS_STRIDE == 0 && started.elapsed() >= budget {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        let mut scope = Scope::new();
        scope.push_dynamic(DATA_BINDING, to_script(input)?);

        Ok(Self { engine, scope })
    }
}
