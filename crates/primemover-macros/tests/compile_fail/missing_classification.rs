use primemover_macros::entity;

struct Buffer;

#[entity]
impl Buffer {
    fn put(&self, qty: u32) -> Result<(), std::convert::Infallible> {
        Ok(())
    }
}

fn main() {}
