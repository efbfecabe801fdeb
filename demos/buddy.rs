use std::io::Read;

use rbuddy::{BuddyAllocator, HEADER_SIZE, config::MMAP_THRESHOLD, program_break};

/// Waits until the user presses ENTER.
/// Handy for inspecting the process with `pmap` or `gdb` between steps.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn print_state(
  label: &str,
  allocator: &BuddyAllocator,
) {
  println!(
    "[{}] free blocks = {}, free bytes = {}, blocks = {}, bytes = {}, metadata = {}, \
     program break = {:#x}",
    label,
    allocator.free_blocks(),
    allocator.free_bytes(),
    allocator.allocated_blocks(),
    allocator.allocated_bytes(),
    allocator.metadata_bytes(),
    program_break().unwrap_or_default(),
  );
}

fn main() {
  let mut allocator = BuddyAllocator::new();

  println!("PID = {}, header size = {} bytes", std::process::id(), HEADER_SIZE);
  print_state("start", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) First allocation reserves the arena and splits one top block
  //    down to order 1.
  // --------------------------------------------------------------------
  let first = allocator.allocate(100).expect("allocation failed");
  println!("\n[1] allocate(100) = {:p}", first);
  if let Some(range) = allocator.arena_range() {
    println!("[1] arena = {:#x}..{:#x}", range.start, range.end);
  }
  print_state("1", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) A second small block comes out of the buddy left by the split.
  // --------------------------------------------------------------------
  let second = allocator.allocate(100).expect("allocation failed");
  println!("\n[2] allocate(100) = {:p}", second);
  println!(
    "[2] distance from first block = {} bytes",
    second.as_ptr() as usize - first.as_ptr() as usize
  );
  print_state("2", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Freeing both merges every piece back into one top block.
  // --------------------------------------------------------------------
  unsafe {
    allocator.release(first.as_ptr());
    allocator.release(second.as_ptr());
  }
  println!("\n[3] released both blocks");
  print_state("3", &allocator);

  let reused = allocator.allocate(100).expect("allocation failed");
  println!(
    "[3] allocate(100) = {:p}, same as first? {}",
    reused,
    if reused == first { "yes" } else { "no" }
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Large requests bypass the arena.
  // --------------------------------------------------------------------
  let large = allocator.allocate(MMAP_THRESHOLD).expect("mmap failed");
  println!("\n[4] allocate({}) = {:p} (mapped)", MMAP_THRESHOLD, large);
  print_state("4", &allocator);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Growing a block moves it and keeps its contents.
  // --------------------------------------------------------------------
  unsafe {
    reused.as_ptr().write_bytes(0x42, 100);
    let grown = allocator.reallocate(reused.as_ptr(), 10_000).expect("realloc failed");
    println!(
      "\n[5] reallocate(.., 10000) = {:p}, first byte = {:#x}",
      grown,
      grown.as_ptr().read()
    );

    allocator.release(grown.as_ptr());
    allocator.release(large.as_ptr());
  }

  print_state("end", &allocator);
  println!("{:#?}", allocator.stats());
}
