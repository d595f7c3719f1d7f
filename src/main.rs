fn main() {
    slime_arm::game::run();
}
