//! Multi-input pipes that advance several sources in lockstep
//!
//! A zip yields one tuple per round and stops as soon as any input is
//! exhausted. Inputs are advanced, reset and disposed in index order.

use crate::cursor::{Cursor, Item, Source, Upstream};
use crate::path::Path;
use crate::pipe::Pipe;

macro_rules! zip_pipe {
    ($(#[$doc:meta])* $name:ident, $arity:literal; $first:ident: $first_input:ident $(, $ty:ident: $input:ident)+) => {
        $(#[$doc])*
        pub struct $name<$first, $($ty),+> {
            $first_input: Upstream<$first>,
            $($input: Upstream<$ty>,)+
            current: Option<($first, $($ty),+)>,
        }

        impl<$first: Item, $($ty: Item),+> $name<$first, $($ty),+> {
            pub const ARITY: usize = $arity;

            #[allow(clippy::too_many_arguments)]
            pub fn new($first_input: Source<$first>, $($input: Source<$ty>),+) -> Self {
                let mut pipe = Self {
                    $first_input: Upstream::new(),
                    $($input: Upstream::new(),)+
                    current: None,
                };
                pipe.$first_input.set($first_input);
                $(pipe.$input.set($input);)+
                pipe
            }
        }

        impl<$first: Item, $($ty: Item),+> Cursor<($first, $($ty),+)> for $name<$first, $($ty),+> {
            fn move_next(&mut self) -> bool {
                self.current = None;
                if !self.$first_input.move_next() {
                    return false;
                }
                $(
                    if !self.$input.move_next() {
                        return false;
                    }
                )+
                let (Some($first_input), $(Some($input)),+) =
                    (self.$first_input.current(), $(self.$input.current()),+)
                else {
                    return false;
                };
                self.current = Some(($first_input.clone(), $($input.clone()),+));
                true
            }

            fn current(&self) -> Option<&($first, $($ty),+)> {
                self.current.as_ref()
            }

            fn reset(&mut self) {
                self.$first_input.reset();
                $(self.$input.reset();)+
                self.current = None;
            }

            fn dispose(&mut self) {
                self.$first_input.dispose();
                $(self.$input.dispose();)+
                self.current = None;
            }

            fn path(&self) -> Path {
                let Some(current) = &self.current else {
                    return Path::new();
                };
                let mut path = self.$first_input.path();
                $(path.extend(self.$input.path());)+
                path.push(current.clone());
                path
            }
        }

        /// Setting a source replaces the first input and rewinds the others
        impl<$first: Item, $($ty: Item),+> Pipe<$first, ($first, $($ty),+)> for $name<$first, $($ty),+> {
            fn set_source(&mut self, source: Source<$first>) {
                self.$first_input.set(source);
                $(self.$input.reset();)+
                self.current = None;
            }
        }
    };
}

zip_pipe!(
    /// Pairs up two inputs
    ZipPipe2, 2; A: first, B: second
);
zip_pipe!(
    /// Joins three inputs
    ZipPipe3, 3; A: first, B: second, C: third
);
zip_pipe!(
    /// Joins four inputs
    ZipPipe4, 4; A: first, B: second, C: third, D: fourth
);
zip_pipe!(
    /// Joins five inputs
    ZipPipe5, 5; A: first, B: second, C: third, D: fourth, E: fifth
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipe::Pipeline;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every reset it receives under `name`
    struct Recorder {
        name: &'static str,
        log: Rc<RefCell<Vec<&'static str>>>,
        inner: crate::cursor::VecCursor<u8>,
    }

    impl Cursor<u8> for Recorder {
        fn move_next(&mut self) -> bool {
            self.inner.move_next()
        }

        fn current(&self) -> Option<&u8> {
            self.inner.current()
        }

        fn reset(&mut self) {
            self.log.borrow_mut().push(self.name);
            self.inner.reset();
        }

        fn dispose(&mut self) {
            self.log.borrow_mut().push(self.name);
            self.inner.dispose();
        }

        fn path(&self) -> Path {
            self.inner.path()
        }
    }

    #[test]
    fn test_zip_stops_at_shortest_input() {
        let zip = ZipPipe2::new(Source::collection(vec![1, 2, 3]), Source::collection(vec!["a", "b"]));
        assert_eq!(Pipeline::new(zip).collect::<Vec<_>>(), vec![(1, "a"), (2, "b")]);
    }

    #[test]
    fn test_five_inputs() {
        let mut zip = ZipPipe5::new(
            Source::single(1u8),
            Source::single('b'),
            Source::single("c"),
            Source::single(4i64),
            Source::single(true),
        );
        assert_eq!(ZipPipe5::<u8, char, &str, i64, bool>::ARITY, 5);
        assert!(zip.move_next());
        assert_eq!(zip.current(), Some(&(1, 'b', "c", 4, true)));
        assert!(!zip.move_next());
    }

    #[test]
    fn test_reset_and_dispose_visit_inputs_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let input = |name| {
            Source::cursor(Recorder {
                name,
                log: log.clone(),
                inner: crate::cursor::VecCursor::new(vec![0, 1]),
            })
        };
        let mut zip = ZipPipe3::new(input("first"), input("second"), input("third"));

        zip.move_next();
        zip.reset();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);

        log.borrow_mut().clear();
        zip.dispose();
        assert_eq!(*log.borrow(), vec!["first", "second", "third"]);
        assert!(!zip.move_next());
    }

    #[test]
    fn test_path_concatenates_inputs() {
        let mut zip = ZipPipe2::new(Source::single(7i32), Source::single(8i32));
        assert!(zip.move_next());
        let path = zip.path();
        assert_eq!(path.values::<i32>(), vec![&7, &8]);
        assert!(path.last().unwrap().is::<(i32, i32)>());
    }

    #[test]
    fn test_set_source_rewinds_other_inputs() {
        let mut zip = ZipPipe2::new(Source::collection(vec![1, 2]), Source::collection(vec![10, 20]));
        zip.move_next();
        zip.set_source(Source::collection(vec![5]));

        assert!(zip.move_next());
        assert_eq!(zip.current(), Some(&(5, 10)));
    }
}
