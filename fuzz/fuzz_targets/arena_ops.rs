#![no_main]

use std::collections::VecDeque;
use std::io::Cursor;

use blocksig::BlockArena;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (u8, Vec<bool>)| {
    let (capacity, ops) = input;
    let capacity = usize::from(capacity % 8) + 1;
    let mut arena = BlockArena::new(capacity, 2).unwrap();
    let mut source = Cursor::new(vec![0u8; ops.len() * 2]);

    let mut next = 0u64;
    let mut held = VecDeque::new();

    for fill in ops {
        if fill {
            let had_room = arena.available() > 0;
            let filled = arena.try_fill(next, &mut source).unwrap();
            assert_eq!(filled, had_room);
            if filled {
                held.push_back(next);
                next += 1;
            }
        } else if let Some(index) = held.pop_front() {
            arena.release(index).unwrap();
            assert!(arena.release(index).is_err());
        }

        // Verify: every cell is either free or holds exactly one block
        assert_eq!(arena.available() + arena.mapped(), arena.capacity());
        assert_eq!(arena.mapped(), held.len());
    }
});
