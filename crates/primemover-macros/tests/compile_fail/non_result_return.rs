use primemover_macros::entity;

struct Buffer;

#[entity]
impl Buffer {
    #[event]
    fn put(&self, qty: u32) {}
}

fn main() {}
