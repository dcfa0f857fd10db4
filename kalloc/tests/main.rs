use std::{collections::HashSet, thread};

use aok::{OK, Void};
use kalloc::{ALLOC_JUNK, Conf, Error, Kalloc, PAGE_SIZE, Page, Region, Spread};
use klock::cpu;
use log::info;

#[static_init::constructor(0)]
extern "C" fn _log_init() {
  log_init::init();
}

fn kalloc(npages: usize, ncpu: usize) -> Kalloc {
  Kalloc::new(Region::alloc(npages).unwrap(), &[Conf::Ncpu(ncpu)])
}

#[test]
fn test_region_alloc() -> Void {
  let region = Region::alloc(16)?;
  assert_eq!(region.npages(), 16);
  assert_eq!(region.start() % PAGE_SIZE, 0);
  assert_eq!(region.end() - region.start(), 16 * PAGE_SIZE);

  assert_eq!(region.index(region.start()), Some(0));
  assert_eq!(region.index(region.start() + 3 * PAGE_SIZE), Some(3));
  assert_eq!(region.index(region.start() + 1), None);
  assert_eq!(region.index(region.end()), None);
  assert_eq!(region.index(region.start().wrapping_sub(PAGE_SIZE)), None);

  assert!(matches!(Region::alloc(0), Err(Error::EmptyRegion(..))));
  OK
}

#[test]
fn test_region_from_range() -> Void {
  info!("> 接管未对齐区间");

  let mut mem = vec![0u8; 8 * PAGE_SIZE];
  let start = mem.as_mut_ptr() as usize + 100;
  let end = start + 5 * PAGE_SIZE + 50;

  let first = (start + PAGE_SIZE - 1) & !(PAGE_SIZE - 1);
  let expect = (end - first) / PAGE_SIZE;

  let region = unsafe { Region::from_range(start, end)? };
  assert_eq!(region.start(), first);
  assert_eq!(region.npages(), expect);
  assert!(region.end() <= end);

  let k = Kalloc::new(region, &[Conf::Ncpu(2)]);
  let mut got = Vec::new();
  while let Ok(page) = k.alloc() {
    assert!(page.addr() >= start && page.addr() + PAGE_SIZE <= end);
    got.push(page);
  }
  assert_eq!(got.len(), expect);
  for p in got {
    k.free(p);
  }
  drop(k);

  assert!(matches!(
    unsafe { Region::from_range(start, start + 10) },
    Err(Error::EmptyRegion(..))
  ));
  drop(mem);
  OK
}

#[test]
fn test_init_on_boot_cpu() -> Void {
  cpu::bind(2);
  let k = kalloc(64, 4);
  assert_eq!(k.npages(), 64);
  assert_eq!(k.ncpu(), 4);
  assert_eq!(k.shard_len(2), 64);
  for c in [0, 1, 3] {
    assert_eq!(k.shard_len(c), 0);
  }
  assert_eq!(k.free_pages(), 64);
  assert_eq!(k.stat().free, 0);
  OK
}

#[test]
fn test_init_round_robin() -> Void {
  let k = Kalloc::new(
    Region::alloc(66)?,
    &[Conf::Ncpu(4), Conf::Spread(Spread::RoundRobin)],
  );
  assert_eq!(
    (0..4).map(|c| k.shard_len(c)).collect::<Vec<_>>(),
    [17, 17, 16, 16]
  );
  assert_eq!(k.free_pages(), 66);
  OK
}

#[test]
fn test_zero_cpu_clamped() -> Void {
  let k = Kalloc::new(Region::alloc(4)?, &[Conf::Ncpu(0)]);
  assert_eq!(k.ncpu(), 1);
  OK
}

#[test]
fn test_alloc_fill_and_write() -> Void {
  let k = kalloc(4, 1);
  let mut page = k.alloc()?;
  assert_eq!(page.addr() % PAGE_SIZE, 0);
  assert!(page.as_slice().iter().all(|&b| b == ALLOC_JUNK));

  page.as_mut_slice()[..5].copy_from_slice(b"hello");
  assert_eq!(&page.as_slice()[..5], b"hello");

  k.free(page);
  let page = k.alloc()?;
  // Freed data is overwritten / 释放后的数据被覆盖
  assert!(page.as_slice().iter().all(|&b| b == ALLOC_JUNK));
  k.free(page);
  OK
}

#[test]
fn test_lifo_local() -> Void {
  let k = kalloc(8, 1);
  let a = k.alloc()?;
  let addr = a.addr();
  k.free(a);
  let b = k.alloc()?;
  assert_eq!(b.addr(), addr);
  k.free(b);
  OK
}

#[test]
fn test_out_of_memory() -> Void {
  info!("> 全部分片耗尽");

  let k = kalloc(3, 2);
  let pages: Vec<Page> = (0..3).map(|_| k.alloc()).collect::<Result<_, _>>()?;
  assert!(matches!(k.alloc(), Err(Error::OutOfMemory)));
  assert_eq!(k.stat().fail, 1);
  assert_eq!(k.free_pages(), 0);

  for p in pages {
    k.free(p);
  }
  assert_eq!(k.free_pages(), 3);
  assert!(k.alloc().is_ok_and(|p| {
    k.free(p);
    true
  }));
  OK
}

#[test]
fn test_steal_only_when_local_empty() -> Void {
  info!("> 本地为空时才窃取");

  let k = kalloc(10, 4);
  assert_eq!(k.shard_len(0), 10);

  thread::scope(|s| {
    s.spawn(|| {
      cpu::bind(1);
      let page = k.alloc().unwrap();
      assert_eq!(k.stat().steal, 1);
      assert_eq!(k.shard_len(0), 9);

      // Freed onto cpu 1 / 释放到 1 号 CPU
      k.free(page);
      assert_eq!(k.shard_len(1), 1);

      // Local first, no steal / 先用本地，不窃取
      let page = k.alloc().unwrap();
      assert_eq!(k.stat().steal, 1);
      assert_eq!(k.shard_len(1), 0);
      assert_eq!(k.shard_len(0), 9);
      k.free(page);
    });
  });

  let stat = k.stat();
  assert_eq!((stat.alloc, stat.free, stat.steal), (2, 2, 1));
  OK
}

#[test]
fn test_steal_fixed_order() -> Void {
  let k = Kalloc::new(
    Region::alloc(8)?,
    &[Conf::Ncpu(4), Conf::Spread(Spread::RoundRobin)],
  );

  thread::scope(|s| {
    s.spawn(|| {
      cpu::bind(3);
      let mine: Vec<Page> = (0..2).map(|_| k.alloc().unwrap()).collect();
      assert_eq!(k.stat().steal, 0);

      // cpu 0 is scanned first / 先扫描 0 号 CPU
      let stolen = k.alloc().unwrap();
      assert_eq!(k.stat().steal, 1);
      assert_eq!(k.shard_len(0), 1);
      assert_eq!(k.shard_len(1), 2);
      assert_eq!(k.shard_len(2), 2);

      for p in mine {
        k.free(p);
      }
      k.free(stolen);
      assert_eq!(k.shard_len(3), 3);
    });
  });
  OK
}

#[test]
#[should_panic(expected = "kfree: bad address")]
fn test_free_unaligned_panics() {
  let k = kalloc(2, 1);
  let addr = k.alloc().unwrap().into_raw();
  k.free(unsafe { k.page_from_raw(addr + 8) });
}

#[test]
#[should_panic(expected = "kfree: bad address")]
fn test_free_foreign_page_panics() {
  let a = kalloc(2, 1);
  let b = kalloc(2, 1);
  let page = a.alloc().unwrap();
  let addr = page.into_raw();
  b.free(unsafe { b.page_from_raw(addr) });
}

#[test]
#[should_panic(expected = "double free")]
fn test_double_free_panics() {
  let k = kalloc(2, 1);
  let addr = k.alloc().unwrap().into_raw();
  k.free(unsafe { k.page_from_raw(addr) });
  k.free(unsafe { k.page_from_raw(addr) });
}

#[test]
#[should_panic(expected = "out of range")]
fn test_cpu_out_of_range_panics() {
  let k = kalloc(2, 2);
  cpu::bind(5);
  let _ = k.alloc();
}

#[test]
fn test_concurrent_conservation() -> Void {
  info!("> 多 CPU 并发守恒");

  const NCPU: usize = 4;
  const NPAGES: usize = 256;
  let k = Kalloc::new(
    Region::alloc(NPAGES)?,
    &[Conf::Ncpu(NCPU), Conf::Spread(Spread::Boot)],
  );

  let held: Vec<Vec<usize>> = thread::scope(|s| {
    let handles: Vec<_> = (0..NCPU)
      .map(|id| {
        let k = &k;
        s.spawn(move || {
          cpu::bind(id);
          let mut mine: Vec<Page> = Vec::new();
          for round in 0..2000usize {
            if (round + id) % 3 != 0 {
              if let Ok(mut p) = k.alloc() {
                // Tag with owner to catch double allocation / 标记所有者以发现重复分配
                p.as_mut_slice()[0] = id as u8;
                mine.push(p);
              }
            } else if let Some(p) = mine.pop() {
              assert_eq!(p.as_slice()[0], id as u8);
              k.free(p);
            }
          }
          let keep = mine.len() / 2;
          for p in mine.drain(keep..) {
            k.free(p);
          }
          mine.into_iter().map(Page::into_raw).collect::<Vec<_>>()
        })
      })
      .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
  });

  let held: Vec<usize> = held.into_iter().flatten().collect();
  let unique: HashSet<usize> = held.iter().copied().collect();
  assert_eq!(unique.len(), held.len());
  assert_eq!(k.free_pages() + held.len(), NPAGES);

  let stat = k.stat();
  assert_eq!(stat.alloc - stat.free, held.len() as u64);
  info!("stat {stat:?}");

  for addr in held {
    k.free(unsafe { k.page_from_raw(addr) });
  }
  assert_eq!(k.free_pages(), NPAGES);
  OK
}

mod prop {
  use proptest::prelude::*;

  use super::*;

  #[derive(Debug, Clone)]
  enum Op {
    Alloc(usize),
    Free(usize, usize),
  }

  fn arb_op(ncpu: usize) -> impl Strategy<Value = Op> {
    prop_oneof![
      (0..ncpu).prop_map(Op::Alloc),
      (0..ncpu, any::<usize>()).prop_map(|(c, i)| Op::Free(c, i)),
    ]
  }

  proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// free lists + allocated == all pages, after every step
    /// 每一步之后：空闲链表 + 已分配 == 全部页
    #[test]
    fn prop_conservation(
      npages in 1usize..48,
      ops in prop::collection::vec(arb_op(4), 0..200),
    ) {
      let k = Kalloc::new(Region::alloc(npages).unwrap(), &[Conf::Ncpu(4)]);
      let mut held: Vec<Page> = Vec::new();

      for op in ops {
        match op {
          Op::Alloc(c) => {
            cpu::bind(c);
            match k.alloc() {
              Ok(p) => held.push(p),
              Err(Error::OutOfMemory) => prop_assert_eq!(held.len(), npages),
              Err(e) => prop_assert!(false, "unexpected {e}"),
            }
          }
          Op::Free(c, i) => {
            if !held.is_empty() {
              cpu::bind(c);
              let p = held.swap_remove(i % held.len());
              k.free(p);
            }
          }
        }
        prop_assert_eq!(k.free_pages() + held.len(), npages);
        let unique: HashSet<usize> = held.iter().map(Page::addr).collect();
        prop_assert_eq!(unique.len(), held.len());
      }

      cpu::bind(0);
      for p in held {
        k.free(p);
      }
      prop_assert_eq!(k.free_pages(), npages);
    }
  }
}
