fn main() {
    std::process::exit(policy_judge::run());
}
