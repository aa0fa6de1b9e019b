pub mod audit;
pub mod garble;
pub mod ot;

pub use audit::*;
pub use garble::*;
pub use ot::*;

use crypto_core::AbstractChannel;
use std::io::Result;

pub fn send_wirelabels<C: AbstractChannel>(channel: &mut C, wls: &[WireLabel]) -> Result<()> {
    for wl in wls.iter() {
        channel.write_usize(wl.id)?;
        channel.write_block(&wl.label)?;
    }
    Ok(())
}

pub fn receive_wirelabels<C: AbstractChannel>(
    channel: &mut C,
    n: usize,
) -> Result<Vec<WireLabel>> {
    let mut res = Vec::with_capacity(n);
    for _ in 0..n {
        let id = channel.read_usize()?;
        let label = channel.read_block()?;
        res.push(WireLabel { id, label });
    }
    Ok(res)
}

#[cfg(test)]
mod tests {
    use crypto_core::{local_channel_pair, AbstractChannel, AesRng, Block};
    use rand::Rng;
    use std::thread;

    use crate::{receive_wirelabels, send_wirelabels, WireLabel};

    #[test]
    fn send_recv_wls_test() {
        let mut rng = AesRng::new();
        let size = 100;
        let wls = (0..size)
            .map(|x| {
                let label = rng.gen::<Block>();
                WireLabel { id: x, label }
            })
            .collect::<Vec<WireLabel>>();

        let wls1 = wls.clone();
        let (mut sender, mut receiver) = local_channel_pair().unwrap();

        let handle = thread::spawn(move || {
            send_wirelabels(&mut sender, &wls1).unwrap();
            sender.flush().unwrap();
        });

        assert_eq!(receive_wirelabels(&mut receiver, size).unwrap(), wls);
        handle.join().unwrap();
    }
}
