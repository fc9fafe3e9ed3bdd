use datamask_mask::faker_rs::FakeRsAdapter;

fn main() {
    for id in FakeRsAdapter::list_ids() {
        println!("synthetic {id}");
    }
    println!("lookup lookup");
}
