use avlbst::avl_tree::*;
use avlbst::equal_paths::equal_paths;
use avlbst::shared_string_writer::SharedStringWriter;

fn run(title: &str, inserts: &[i32], removes: &[i32]) {
    let writer = SharedStringWriter::new();
    let mut tree: AvlMapDebug<i32, i32> = AvlMapDebug::new_with_debug_writer(Some(writer.clone()));
    for &k in inserts {
        tree.insert(k, k * 10);
    }
    for &k in removes {
        tree.remove(&k);
    }
    println!("== {}", title);
    print!("{}", writer.borrow());
    print!("{}", tree.pretty_print_to_string());
    println!(
        "height: {}, leaves level: {}",
        tree.height(),
        equal_paths(tree.root())
    );
}

pub fn main() {
    run("ascending", &[10, 20, 30], &[]);
    run("zig-zag", &[30, 10, 20], &[]);
    run("remove from the left", &[1, 2, 3, 4, 5, 6, 7], &[1, 2]);
    run(
        "cascading removal",
        &[20, 9, 24, 12, 23, 27, 21, 17, 1, 15, 8, 2],
        &[27],
    );
}
