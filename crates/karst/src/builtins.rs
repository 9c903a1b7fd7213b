//! Builtin special forms and procedures.
//!
//! Keyword dispatch happens at parse time: the form recognizer maps a head
//! symbol to a [`Builtin`] kind tag and emits a `Primitive` node carrying the
//! unevaluated argument expressions. At evaluation time each builtin checks
//! its own arity and argument types, evaluating arguments in textual order
//! except where short-circuit semantics (`and`, `or`, `if`) say otherwise.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{
    eval::Vm,
    exception::{Exception, RunResult},
    heap::{Formals, HeapData, Lambda, Pair},
    scope::ScopeId,
    value::Value,
};

/// Kind tag identifying a builtin form or procedure.
///
/// The strum derives map each variant to its surface keyword, so parse-time
/// dispatch is `Builtin::from_str(name)` and error messages render the
/// keyword via `Display`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
    Serialize,
    Deserialize,
)]
pub(crate) enum Builtin {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "=")]
    NumEq,
    #[strum(serialize = "min")]
    Min,
    #[strum(serialize = "max")]
    Max,
    #[strum(serialize = "abs")]
    Abs,
    #[strum(serialize = "not")]
    Not,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
    #[strum(serialize = "number?")]
    IsNumber,
    #[strum(serialize = "boolean?")]
    IsBoolean,
    #[strum(serialize = "symbol?")]
    IsSymbol,
    #[strum(serialize = "pair?")]
    IsPair,
    #[strum(serialize = "list?")]
    IsList,
    #[strum(serialize = "null?")]
    IsNull,
    #[strum(serialize = "cons")]
    Cons,
    #[strum(serialize = "car")]
    Car,
    #[strum(serialize = "cdr")]
    Cdr,
    #[strum(serialize = "list")]
    List,
    #[strum(serialize = "list-ref")]
    ListRef,
    #[strum(serialize = "list-tail")]
    ListTail,
    #[strum(serialize = "define")]
    Define,
    #[strum(serialize = "set!")]
    SetBang,
    #[strum(serialize = "set-car!")]
    SetCar,
    #[strum(serialize = "set-cdr!")]
    SetCdr,
    #[strum(serialize = "if")]
    If,
}

/// Evaluates one builtin call against the given scope.
pub(crate) fn eval_primitive(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    match op {
        Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div => numeric_fold(vm, op, args, scope),
        Builtin::Lt | Builtin::Gt | Builtin::Le | Builtin::Ge | Builtin::NumEq => comparison(vm, op, args, scope),
        Builtin::Min | Builtin::Max => extremum(vm, op, args, scope),
        Builtin::Abs => abs(vm, args, scope),
        Builtin::Not => not(vm, args, scope),
        Builtin::And | Builtin::Or => logic_chain(vm, op, args, scope),
        Builtin::IsNumber
        | Builtin::IsBoolean
        | Builtin::IsSymbol
        | Builtin::IsPair
        | Builtin::IsList
        | Builtin::IsNull => type_test(vm, op, args, scope),
        Builtin::Cons => cons(vm, args, scope),
        Builtin::Car | Builtin::Cdr => pair_field(vm, op, args, scope),
        Builtin::List => list(vm, args, scope),
        Builtin::ListRef | Builtin::ListTail => list_index(vm, op, args, scope),
        Builtin::Define => define(vm, args, scope),
        Builtin::SetBang => set_bang(vm, args, scope),
        Builtin::SetCar | Builtin::SetCdr => set_pair_field(vm, op, args, scope),
        Builtin::If => if_form(vm, args, scope),
    }
}

/// Evaluates every argument, requiring each to reduce to a number.
fn eval_numbers(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Vec<i64>> {
    let mut numbers = Vec::with_capacity(args.len());
    for &arg in args {
        match vm.eval(arg, scope)? {
            Value::Int(n) => numbers.push(n),
            other => {
                return Err(Exception::runtime(format!(
                    "'{op}' expects numbers, got a {}",
                    other.type_name(vm.heap)
                )));
            }
        }
    }
    Ok(numbers)
}

fn numeric_fold(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let numbers = eval_numbers(vm, op, args, scope)?;
    let Some((&first, rest)) = numbers.split_first() else {
        // `+` and `*` have identity elements; `-` and `/` do not.
        return match op {
            Builtin::Add => Ok(Value::Int(0)),
            Builtin::Mul => Ok(Value::Int(1)),
            _ => Err(Exception::runtime(format!("'{op}' needs at least one argument"))),
        };
    };
    let mut acc = first;
    for &n in rest {
        acc = match op {
            Builtin::Add => acc.wrapping_add(n),
            Builtin::Sub => acc.wrapping_sub(n),
            Builtin::Mul => acc.wrapping_mul(n),
            Builtin::Div => {
                if n == 0 {
                    return Err(Exception::runtime("division by zero"));
                }
                acc.wrapping_div(n)
            }
            _ => unreachable!("numeric_fold only handles arithmetic ops"),
        };
    }
    Ok(Value::Int(acc))
}

fn comparison(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let numbers = eval_numbers(vm, op, args, scope)?;
    // Zero or one argument: nothing to compare, the chain holds vacuously.
    let holds = numbers.windows(2).all(|pair| match op {
        Builtin::Lt => pair[0] < pair[1],
        Builtin::Gt => pair[0] > pair[1],
        Builtin::Le => pair[0] <= pair[1],
        Builtin::Ge => pair[0] >= pair[1],
        Builtin::NumEq => pair[0] == pair[1],
        _ => unreachable!("comparison only handles ordering ops"),
    });
    Ok(Value::Bool(holds))
}

fn extremum(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let numbers = eval_numbers(vm, op, args, scope)?;
    let Some(&first) = numbers.first() else {
        return Err(Exception::runtime(format!("'{op}' needs at least one argument")));
    };
    let result = numbers.iter().skip(1).fold(first, |acc, &n| match op {
        Builtin::Max => acc.max(n),
        _ => acc.min(n),
    });
    Ok(Value::Int(result))
}

fn abs(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [arg] = args else {
        return Err(Exception::runtime(format!("'abs' expects 1 argument, got {}", args.len())));
    };
    match vm.eval(*arg, scope)? {
        Value::Int(n) => Ok(Value::Int(n.wrapping_abs())),
        other => Err(Exception::runtime(format!(
            "'abs' expects a number, got a {}",
            other.type_name(vm.heap)
        ))),
    }
}

/// `not` answers `#t` only for `#f` itself; every other value, booleans
/// aside, already counts as truthy and maps to `#f`.
fn not(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [arg] = args else {
        return Err(Exception::runtime(format!("'not' expects 1 argument, got {}", args.len())));
    };
    let value = vm.eval(*arg, scope)?;
    Ok(Value::Bool(value == Value::Bool(false)))
}

/// Short-circuiting `and`/`or`.
///
/// Arguments are evaluated left to right; any value other than `#f` counts
/// as truthy. The argument that decides the outcome is returned as-is, so
/// `(or #f 5 x)` yields `5` without touching `x`, and `(and 1 2)` yields `2`.
fn logic_chain(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let is_and = op == Builtin::And;
    let Some((&last, init)) = args.split_last() else {
        return Ok(Value::Bool(is_and));
    };
    for &arg in init {
        let value = vm.eval(arg, scope)?;
        let truthy = value != Value::Bool(false);
        if truthy != is_and {
            return Ok(value);
        }
    }
    vm.eval(last, scope)
}

fn type_test(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [arg] = args else {
        return Err(Exception::runtime(format!(
            "'{op}' expects 1 argument, got {}",
            args.len()
        )));
    };
    let value = vm.eval(*arg, scope)?;
    let result = match op {
        Builtin::IsNumber => matches!(value, Value::Int(_)),
        Builtin::IsBoolean => matches!(value, Value::Bool(_)),
        Builtin::IsSymbol => matches!(value, Value::Symbol(_)),
        Builtin::IsNull => value == Value::Nil,
        Builtin::IsPair => match value {
            Value::Ref(id) => matches!(vm.heap.get(id), HeapData::Pair(_)),
            _ => false,
        },
        Builtin::IsList => match value {
            Value::Nil => true,
            // Cyclic and improper chains have no spine and are not lists.
            Value::Ref(id) => vm.heap.list_spine(id).is_some(),
            _ => false,
        },
        _ => unreachable!("type_test only handles predicates"),
    };
    Ok(Value::Bool(result))
}

fn cons(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [car, cdr] = args else {
        return Err(Exception::runtime(format!(
            "'cons' expects 2 arguments, got {}",
            args.len()
        )));
    };
    let car = vm.eval(*car, scope)?;
    let cdr = vm.eval(*cdr, scope)?;
    let id = vm.heap.alloc(HeapData::Pair(Pair { car, cdr }));
    Ok(Value::Ref(id))
}

fn pair_field(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [arg] = args else {
        return Err(Exception::runtime(format!(
            "'{op}' expects 1 argument, got {}",
            args.len()
        )));
    };
    let value = vm.eval(*arg, scope)?;
    if let Value::Ref(id) = value
        && let HeapData::Pair(pair) = vm.heap.get(id)
    {
        return Ok(if op == Builtin::Car { pair.car } else { pair.cdr });
    }
    Err(Exception::runtime(format!(
        "'{op}' expects a pair, got {}",
        value.type_name(vm.heap)
    )))
}

fn list(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let mut items = Vec::with_capacity(args.len());
    for &arg in args {
        items.push(vm.eval(arg, scope)?);
    }
    Ok(vm.heap.alloc_list(&items))
}

fn list_index(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [list_arg, index_arg] = args else {
        return Err(Exception::runtime(format!(
            "'{op}' expects 2 arguments, got {}",
            args.len()
        )));
    };
    let target = vm.eval(*list_arg, scope)?;
    let Value::Ref(head) = target else {
        return Err(Exception::runtime(format!(
            "'{op}' expects a list, got {}",
            target.type_name(vm.heap)
        )));
    };
    let Some(spine) = vm.heap.list_spine(head) else {
        return Err(Exception::runtime(format!("'{op}' expects a proper list")));
    };
    let index = match vm.eval(*index_arg, scope)? {
        Value::Int(n) => n,
        other => {
            return Err(Exception::runtime(format!(
                "'{op}' expects a number index, got a {}",
                other.type_name(vm.heap)
            )));
        }
    };
    let Ok(index) = usize::try_from(index) else {
        return Err(Exception::runtime(format!("'{op}' index {index} is out of range")));
    };
    if op == Builtin::ListRef {
        match spine.get(index) {
            Some(&pair_id) => {
                let HeapData::Pair(pair) = vm.heap.get(pair_id) else {
                    unreachable!("spine handles point at pairs");
                };
                Ok(pair.car)
            }
            None => Err(Exception::runtime(format!("'{op}' index {index} is out of range"))),
        }
    } else {
        // list-tail: an index equal to the length is the empty tail.
        match spine.get(index) {
            Some(&pair_id) => Ok(Value::Ref(pair_id)),
            None if index == spine.len() => Ok(Value::Nil),
            None => Err(Exception::runtime(format!("'{op}' index {index} is out of range"))),
        }
    }
}

fn define(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    if args.is_empty() {
        return Err(Exception::syntax("'define' expects a name and a value"));
    }
    // Function shorthand: the recognizer turned `(name params...)` into a
    // parameter-list node. Desugar to binding `name` to a fresh lambda.
    if let Value::Ref(id) = args[0]
        && let HeapData::Formals(formals) = vm.heap.get(id)
    {
        let names = formals.names().to_vec();
        let Some((&name, params)) = names.split_first() else {
            return Err(Exception::syntax("'define' expects a function name"));
        };
        let params_node = vm.heap.alloc(HeapData::Formals(Formals::new(params.to_vec())));
        let body: SmallVec<[Value; 2]> = args[1..].iter().copied().collect();
        let lambda = vm.heap.alloc(HeapData::Lambda(Lambda {
            formals: params_node,
            body,
            captured: None,
        }));
        vm.heap.scope_mut(scope).bind(name, Value::Ref(lambda));
        // Snap the captured environment now, with the name already bound, so
        // the body can call itself.
        vm.eval(Value::Ref(lambda), scope)?;
        return Ok(Value::Nil);
    }
    if args.len() != 2 {
        return Err(Exception::syntax(format!(
            "'define' expects 2 arguments, got {}",
            args.len()
        )));
    }
    let Value::Symbol(name) = args[0] else {
        return Err(Exception::syntax("'define' expects a symbol as the binding name"));
    };
    let value = vm.eval(args[1], scope)?;
    vm.heap.scope_mut(scope).bind(name, value);
    Ok(Value::Nil)
}

fn set_bang(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [target, expr] = args else {
        return Err(Exception::syntax(format!(
            "'set!' expects 2 arguments, got {}",
            args.len()
        )));
    };
    let Value::Symbol(name) = *target else {
        return Err(Exception::syntax("'set!' expects a symbol as the binding name"));
    };
    let value = vm.eval(*expr, scope)?;
    if !vm.heap.set_existing(scope, name, value) {
        return Err(Exception::name(format!(
            "cannot set! undefined variable '{}'",
            vm.interns.get(name)
        )));
    }
    Ok(Value::Nil)
}

fn set_pair_field(vm: &mut Vm<'_>, op: Builtin, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    let [target, expr] = args else {
        return Err(Exception::runtime(format!(
            "'{op}' expects 2 arguments, got {}",
            args.len()
        )));
    };
    let target = vm.eval(*target, scope)?;
    let value = vm.eval(*expr, scope)?;
    if let Value::Ref(id) = target
        && let HeapData::Pair(pair) = vm.heap.get_mut(id)
    {
        if op == Builtin::SetCar {
            pair.car = value;
        } else {
            pair.cdr = value;
        }
        return Ok(Value::Nil);
    }
    Err(Exception::runtime(format!(
        "'{op}' expects a pair, got {}",
        target.type_name(vm.heap)
    )))
}

fn if_form(vm: &mut Vm<'_>, args: &[Value], scope: ScopeId) -> RunResult<Value> {
    if args.len() < 2 || args.len() > 3 {
        return Err(Exception::syntax(format!(
            "'if' expects a test, a consequent, and an optional alternate, got {} argument(s)",
            args.len()
        )));
    }
    let test = vm.eval(args[0], scope)?;
    let Value::Bool(test) = test else {
        return Err(Exception::syntax(format!(
            "'if' expects a boolean test, got {}",
            test.type_name(vm.heap)
        )));
    };
    if test {
        vm.eval(args[1], scope)
    } else if let Some(&alternate) = args.get(2) {
        vm.eval(alternate, scope)
    } else {
        Ok(Value::Nil)
    }
}
