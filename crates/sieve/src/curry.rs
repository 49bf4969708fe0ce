//! Currying for plain closures.
//!
//! `curry2(f)(a)(b) == f(a, b)`, and `uncurry2` undoes it. Arguments
//! captured by an intermediate closure are cloned on each call, so they
//! must be `Clone`.

use std::rc::Rc;

/// Boxed single-argument function, the shape of each curried stage.
pub type Curried<A, R> = Box<dyn Fn(A) -> R>;

pub fn curry2<A, B, R, F>(f: F) -> impl Fn(A) -> Curried<B, R>
where
    F: Fn(A, B) -> R + 'static,
    A: Clone + 'static,
    B: 'static,
    R: 'static,
{
    let f = Rc::new(f);
    move |a: A| -> Curried<B, R> {
        let f = Rc::clone(&f);
        Box::new(move |b: B| f(a.clone(), b))
    }
}

pub fn curry3<A, B, C, R, F>(f: F) -> impl Fn(A) -> Curried<B, Curried<C, R>>
where
    F: Fn(A, B, C) -> R + 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    C: 'static,
    R: 'static,
{
    let f = Rc::new(f);
    move |a: A| -> Curried<B, Curried<C, R>> {
        let f = Rc::clone(&f);
        Box::new(move |b: B| -> Curried<C, R> {
            let f = Rc::clone(&f);
            let a = a.clone();
            Box::new(move |c: C| f(a.clone(), b.clone(), c))
        })
    }
}

pub fn curry4<A, B, C, D, R, F>(f: F) -> impl Fn(A) -> Curried<B, Curried<C, Curried<D, R>>>
where
    F: Fn(A, B, C, D) -> R + 'static,
    A: Clone + 'static,
    B: Clone + 'static,
    C: Clone + 'static,
    D: 'static,
    R: 'static,
{
    let f = Rc::new(f);
    move |a: A| -> Curried<B, Curried<C, Curried<D, R>>> {
        let f = Rc::clone(&f);
        Box::new(move |b: B| -> Curried<C, Curried<D, R>> {
            let f = Rc::clone(&f);
            let a = a.clone();
            Box::new(move |c: C| -> Curried<D, R> {
                let f = Rc::clone(&f);
                let (a, b) = (a.clone(), b.clone());
                Box::new(move |d: D| f(a.clone(), b.clone(), c.clone(), d))
            })
        })
    }
}

pub fn uncurry2<A, B, R, F, G>(f: F) -> impl Fn(A, B) -> R
where
    F: Fn(A) -> G,
    G: Fn(B) -> R,
{
    move |a, b| f(a)(b)
}

pub fn uncurry3<A, B, C, R, F, G, H>(f: F) -> impl Fn(A, B, C) -> R
where
    F: Fn(A) -> G,
    G: Fn(B) -> H,
    H: Fn(C) -> R,
{
    move |a, b, c| f(a)(b)(c)
}

pub fn uncurry4<A, B, C, D, R, F, G, H, I>(f: F) -> impl Fn(A, B, C, D) -> R
where
    F: Fn(A) -> G,
    G: Fn(B) -> H,
    H: Fn(C) -> I,
    I: Fn(D) -> R,
{
    move |a, b, c, d| f(a)(b)(c)(d)
}
